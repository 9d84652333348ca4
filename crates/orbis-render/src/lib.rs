//! Host-side collaborators of the LOD core: view-frustum culling and a
//! CPU-resident geometry store that stands in for GPU buffers.

mod frustum;
mod mesh_store;

pub use frustum::Frustum;
pub use mesh_store::{MeshStore, StoreStats, StoredMesh};
