//! Mesh buffers produced for one region by the mesher.

use glam::DVec3;

use crate::bounds::Aabb;
use crate::face_direction::{FaceDirection, QUAD_INDICES};
use crate::vertex_format::RegionVertex;

/// Vertices emitted per quad.
pub const VERTICES_PER_QUAD: usize = 4;
/// Indices emitted per quad.
pub const INDICES_PER_QUAD: usize = 6;

/// Metadata for a single emitted quad, used for analysis and debugging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuadInfo {
    /// Local coordinates of the solid cell that owns the face.
    pub cell: [u32; 3],
    /// Side of the cell the quad covers.
    pub direction: FaceDirection,
}

/// The mesh output of a region meshing pass.
///
/// Positions are relative to `center`; the host places the geometry there.
#[derive(Clone, Debug)]
pub struct RegionMesh {
    /// World-space centre of the region (the geometry's origin).
    pub center: DVec3,
    /// World-space bounds of the region.
    pub bounds: Aabb,
    /// Vertex positions.
    pub vertices: Vec<[f32; 3]>,
    /// Per-vertex normals, parallel to `vertices`.
    pub normals: Vec<[f32; 3]>,
    /// Triangle list, six indices per quad.
    pub indices: Vec<u32>,
    /// One entry per emitted quad.
    pub quads: Vec<QuadInfo>,
}

impl RegionMesh {
    /// Creates an empty mesh with no reserved storage.
    pub fn new(center: DVec3, bounds: Aabb) -> Self {
        Self {
            center,
            bounds,
            vertices: Vec::new(),
            normals: Vec::new(),
            indices: Vec::new(),
            quads: Vec::new(),
        }
    }

    /// Creates an empty mesh with room for every face of `cells` voxels.
    pub fn with_worst_case_capacity(center: DVec3, bounds: Aabb, cells: usize) -> Self {
        let max_quads = cells * FaceDirection::ALL.len();
        Self {
            center,
            bounds,
            vertices: Vec::with_capacity(max_quads * VERTICES_PER_QUAD),
            normals: Vec::with_capacity(max_quads * VERTICES_PER_QUAD),
            indices: Vec::with_capacity(max_quads * INDICES_PER_QUAD),
            quads: Vec::with_capacity(max_quads),
        }
    }

    /// Pushes the quad for one face of a voxel.
    ///
    /// `origin` is the voxel's minimum corner relative to the region centre and
    /// `voxel_size` its edge length.
    pub fn push_quad(
        &mut self,
        direction: FaceDirection,
        cell: [u32; 3],
        origin: [f32; 3],
        voxel_size: f32,
    ) {
        let base = self.vertices.len() as u32;
        let normal = direction.normal();

        for corner in direction.corners() {
            self.vertices.push([
                origin[0] + corner[0] * voxel_size,
                origin[1] + corner[1] * voxel_size,
                origin[2] + corner[2] * voxel_size,
            ]);
            self.normals.push(normal);
        }
        self.indices.extend(QUAD_INDICES.iter().map(|i| base + i));
        self.quads.push(QuadInfo { cell, direction });
    }

    /// Release unused reserved capacity so only the emitted prefix stays allocated.
    pub fn trim(&mut self) {
        self.vertices.shrink_to_fit();
        self.normals.shrink_to_fit();
        self.indices.shrink_to_fit();
        self.quads.shrink_to_fit();
    }

    /// Interleave positions and normals for upload.
    pub fn interleaved(&self) -> Vec<RegionVertex> {
        self.vertices
            .iter()
            .zip(&self.normals)
            .map(|(&position, &normal)| RegionVertex { position, normal })
            .collect()
    }

    /// Approximate heap footprint of the vertex and index buffers in bytes.
    pub fn byte_size(&self) -> usize {
        self.vertices.len() * RegionVertex::STRIDE + self.indices.len() * std::mem::size_of::<u32>()
    }

    /// Quads covering the `direction` side of their cell.
    pub fn quads_facing(&self, direction: FaceDirection) -> usize {
        self.quads
            .iter()
            .filter(|q| q.direction == direction)
            .count()
    }

    /// Quads emitted.
    pub fn quad_count(&self) -> usize {
        self.quads.len()
    }

    /// No surface crosses the region.
    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> RegionMesh {
        RegionMesh::new(DVec3::ZERO, Aabb::from_center_size(DVec3::ZERO, 1.0))
    }

    #[test]
    fn test_new_mesh_has_no_surface() {
        let mesh = empty();
        assert_eq!(mesh.vertices.len(), 0);
        assert_eq!(mesh.indices.len(), 0);
        assert!(mesh.is_empty());
    }

    #[test]
    fn test_one_quad_is_four_vertices_six_indices() {
        let mut mesh = empty();
        mesh.push_quad(FaceDirection::PosY, [0, 0, 0], [0.0, 0.0, 0.0], 1.0);
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.normals.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 2, 1, 3]);
        assert!(mesh.normals.iter().all(|n| *n == [0.0, 1.0, 0.0]));
    }

    #[test]
    fn test_second_quad_indices_are_offset() {
        let mut mesh = empty();
        mesh.push_quad(FaceDirection::PosX, [0, 0, 0], [0.0, 0.0, 0.0], 1.0);
        mesh.push_quad(FaceDirection::NegX, [0, 0, 0], [0.0, 0.0, 0.0], 1.0);
        assert_eq!(&mesh.indices[6..], &[4, 5, 6, 6, 5, 7]);
    }

    #[test]
    fn test_quad_is_scaled_and_offset() {
        let mut mesh = empty();
        mesh.push_quad(FaceDirection::PosX, [1, 0, 0], [2.0, -4.0, 0.0], 2.0);
        for v in &mesh.vertices {
            assert_eq!(v[0], 4.0);
            assert!((-4.0..=-2.0).contains(&v[1]));
            assert!((0.0..=2.0).contains(&v[2]));
        }
    }

    #[test]
    fn test_quads_grouped_by_side() {
        let mut mesh = empty();
        mesh.push_quad(FaceDirection::PosY, [0, 0, 0], [0.0; 3], 1.0);
        mesh.push_quad(FaceDirection::PosY, [1, 0, 0], [1.0, 0.0, 0.0], 1.0);
        mesh.push_quad(FaceDirection::NegY, [0, 0, 0], [0.0; 3], 1.0);
        assert_eq!(mesh.quads_facing(FaceDirection::PosY), 2);
        assert_eq!(mesh.quads_facing(FaceDirection::NegY), 1);
        assert_eq!(mesh.quads_facing(FaceDirection::PosX), 0);
    }

    #[test]
    fn test_trim_drops_reserved_capacity() {
        let mut mesh = RegionMesh::with_worst_case_capacity(
            DVec3::ZERO,
            Aabb::from_center_size(DVec3::ZERO, 8.0),
            512,
        );
        assert!(mesh.vertices.capacity() >= 512 * 24);
        assert!(mesh.indices.capacity() >= 512 * 36);
        mesh.push_quad(FaceDirection::PosZ, [0, 0, 0], [0.0; 3], 1.0);
        mesh.trim();
        assert!(mesh.vertices.capacity() < 512 * 24);
        assert_eq!(mesh.vertices.len(), 4);
    }

    #[test]
    fn test_interleaved_matches_buffers() {
        let mut mesh = empty();
        mesh.push_quad(FaceDirection::NegZ, [0, 0, 0], [0.0; 3], 1.0);
        let packed = mesh.interleaved();
        assert_eq!(packed.len(), 4);
        assert_eq!(packed[2].position, mesh.vertices[2]);
        assert_eq!(packed[2].normal, [0.0, 0.0, -1.0]);
        assert_eq!(mesh.byte_size(), 4 * 24 + 6 * 4);
    }
}
