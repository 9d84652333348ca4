//! CPU-resident geometry store.
//!
//! Holds each region mesh as upload-ready interleaved vertex bytes and index
//! bytes, keyed by the handle returned to the LOD tree. A windowed host
//! would create GPU buffers here; the headless binary and the tests keep the
//! bytes in memory and track the budget they would occupy.

use glam::DVec3;
use orbis_mesh::{Aabb, GeometryHandle, GeometrySink, RegionMesh};
use rustc_hash::FxHashMap;

/// One stored region mesh.
#[derive(Clone, Debug)]
pub struct StoredMesh {
    /// World-space origin the vertices are relative to.
    pub origin: DVec3,
    pub bounds: Aabb,
    /// Interleaved `RegionVertex` data.
    pub vertex_bytes: Vec<u8>,
    /// `u32` indices.
    pub index_bytes: Vec<u8>,
    pub index_count: u32,
}

impl StoredMesh {
    fn from_mesh(mesh: &RegionMesh) -> Self {
        let vertices = mesh.interleaved();
        Self {
            origin: mesh.center,
            bounds: mesh.bounds,
            vertex_bytes: bytemuck::cast_slice(&vertices).to_vec(),
            index_bytes: bytemuck::cast_slice(&mesh.indices).to_vec(),
            index_count: mesh.indices.len() as u32,
        }
    }

    pub fn byte_size(&self) -> usize {
        self.vertex_bytes.len() + self.index_bytes.len()
    }
}

/// Lifetime counters of a [`MeshStore`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub created: u64,
    pub released: u64,
    pub live: usize,
    pub live_bytes: usize,
    pub peak_bytes: usize,
}

/// Geometry sink that keeps meshes in memory.
#[derive(Default)]
pub struct MeshStore {
    meshes: FxHashMap<GeometryHandle, StoredMesh>,
    next_id: u64,
    created: u64,
    released: u64,
    live_bytes: usize,
    peak_bytes: usize,
}

impl MeshStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, handle: GeometryHandle) -> Option<&StoredMesh> {
        self.meshes.get(&handle)
    }

    pub fn contains(&self, handle: GeometryHandle) -> bool {
        self.meshes.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Total triangles across `handles`, skipping unknown ones.
    pub fn triangle_count(&self, handles: &[GeometryHandle]) -> u64 {
        handles
            .iter()
            .filter_map(|h| self.meshes.get(h))
            .map(|m| u64::from(m.index_count / 3))
            .sum()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            created: self.created,
            released: self.released,
            live: self.meshes.len(),
            live_bytes: self.live_bytes,
            peak_bytes: self.peak_bytes,
        }
    }
}

impl GeometrySink for MeshStore {
    fn create_geometry(&mut self, mesh: RegionMesh) -> GeometryHandle {
        self.next_id += 1;
        let handle = GeometryHandle::new(self.next_id);
        let stored = StoredMesh::from_mesh(&mesh);

        self.live_bytes += stored.byte_size();
        self.peak_bytes = self.peak_bytes.max(self.live_bytes);
        self.created += 1;
        self.meshes.insert(handle, stored);
        handle
    }

    fn release_geometry(&mut self, handle: GeometryHandle) {
        match self.meshes.remove(&handle) {
            Some(stored) => {
                self.live_bytes -= stored.byte_size();
                self.released += 1;
            }
            None => log::warn!("release of unknown geometry handle {}", handle.raw()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbis_mesh::{RegionRequest, RegionVertex, mesh_region};
    use orbis_terrain::{DensityField, DensityParams, ZeroNoise};

    fn cube_mesh() -> RegionMesh {
        let field = DensityField::new(DensityParams::sphere(DVec3::ZERO, 0.5), ZeroNoise);
        mesh_region(&field, &RegionRequest::new(DVec3::ZERO, 4.0, 4))
    }

    #[test]
    fn test_create_stores_upload_bytes() {
        let mut store = MeshStore::new();
        let handle = store.create_geometry(cube_mesh());
        let stored = store.get(handle).unwrap();
        assert_eq!(stored.vertex_bytes.len(), 24 * RegionVertex::STRIDE);
        assert_eq!(stored.index_bytes.len(), 36 * 4);
        assert_eq!(stored.index_count, 36);
        assert_eq!(store.triangle_count(&[handle]), 12);
    }

    #[test]
    fn test_handles_are_unique() {
        let mut store = MeshStore::new();
        let a = store.create_geometry(cube_mesh());
        let b = store.create_geometry(cube_mesh());
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_release_tracks_bytes() {
        let mut store = MeshStore::new();
        let a = store.create_geometry(cube_mesh());
        let b = store.create_geometry(cube_mesh());
        let one = store.get(a).unwrap().byte_size();
        assert_eq!(store.stats().live_bytes, 2 * one);

        store.release_geometry(a);
        assert!(!store.contains(a));
        assert!(store.contains(b));

        let stats = store.stats();
        assert_eq!(stats.live, 1);
        assert_eq!(stats.live_bytes, one);
        assert_eq!(stats.peak_bytes, 2 * one);
        assert_eq!(stats.created, 2);
        assert_eq!(stats.released, 1);
    }

    #[test]
    fn test_unknown_release_is_ignored() {
        let mut store = MeshStore::new();
        store.release_geometry(GeometryHandle::new(42));
        assert_eq!(store.stats().released, 0);
        assert!(store.is_empty());
    }
}
