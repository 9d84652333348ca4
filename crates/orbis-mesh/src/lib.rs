//! Region meshing: naive-cubes face culling over the planet density field, the
//! mesh buffers it produces, and the geometry sink interface those buffers are
//! handed to.

pub mod bounds;
pub mod face_direction;
pub mod mesher;
pub mod region_mesh;
pub mod sink;
pub mod vertex_format;

pub use bounds::Aabb;
pub use face_direction::FaceDirection;
pub use mesher::{MAX_RESOLUTION, RegionRequest, mesh_region};
pub use region_mesh::{QuadInfo, RegionMesh};
pub use sink::{GeometryHandle, GeometrySink};
pub use vertex_format::RegionVertex;
