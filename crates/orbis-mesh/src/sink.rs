//! Interface to the host that owns renderable geometry.

use crate::region_mesh::RegionMesh;

/// Opaque handle to a geometry resource owned by a [`GeometrySink`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryHandle(u64);

impl GeometryHandle {
    /// Wrap a sink-specific identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The sink-specific identifier.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Receives finished region meshes and hands back handles to them.
///
/// Every handle returned by `create_geometry` is passed to `release_geometry`
/// exactly once.
pub trait GeometrySink {
    /// Take ownership of a mesh and build a renderable resource from it.
    fn create_geometry(&mut self, mesh: RegionMesh) -> GeometryHandle;

    /// Free the resource behind `handle`.
    fn release_geometry(&mut self, handle: GeometryHandle);
}
