//! Naive-cubes region mesher.
//!
//! Every solid voxel of a cubic region gets one quad per face whose neighbour
//! is air. Neighbours outside the region are classified through the same
//! density field as the interior, so two adjacent regions always agree on
//! which faces exist along their shared plane.

use glam::DVec3;
use orbis_terrain::{DensityField, NoiseSource};

use crate::bounds::Aabb;
use crate::face_direction::FaceDirection;
use crate::region_mesh::RegionMesh;

/// Largest supported voxels-per-edge. The worst-case buffers of a region
/// grow with the cube of the resolution.
pub const MAX_RESOLUTION: u32 = 64;

/// Everything a worker needs to mesh one cubic region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionRequest {
    /// World-space centre of the region.
    pub center: DVec3,
    /// Edge length of the region in world units.
    pub scale: f64,
    /// Voxels per edge.
    pub resolution: u32,
}

impl RegionRequest {
    /// Describe a region by centre, edge length and voxel resolution.
    pub fn new(center: DVec3, scale: f64, resolution: u32) -> Self {
        Self {
            center,
            scale,
            resolution,
        }
    }

    /// Edge length of one voxel.
    pub fn voxel_size(&self) -> f64 {
        self.scale / self.resolution as f64
    }

    /// Minimum corner of the region.
    pub fn min_corner(&self) -> DVec3 {
        self.center - DVec3::splat(self.scale * 0.5)
    }

    /// World-space bounds of the region.
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center_size(self.center, self.scale)
    }

    /// World position sampled for the voxel at local `(x, y, z)`.
    ///
    /// Coordinates may lie one step outside `[0, resolution)` to reach
    /// neighbouring regions.
    pub fn sample_point(&self, x: i32, y: i32, z: i32) -> DVec3 {
        self.min_corner() + DVec3::new(x as f64, y as f64, z as f64) * self.voxel_size()
    }
}

/// Solid/air samples for the region plus a one-voxel ring around it.
struct SampleGrid {
    dim: usize,
    solid: Vec<bool>,
}

impl SampleGrid {
    fn sample<N: NoiseSource>(field: &DensityField<N>, request: &RegionRequest) -> Self {
        let r = request.resolution as i32;
        let dim = request.resolution as usize + 2;
        let mut solid = vec![false; dim * dim * dim];

        for x in -1..=r {
            for y in -1..=r {
                for z in -1..=r {
                    let p = request.sample_point(x, y, z);
                    solid[Self::index(dim, x, y, z)] = field.classify(p).is_solid();
                }
            }
        }

        Self { dim, solid }
    }

    #[inline]
    fn index(dim: usize, x: i32, y: i32, z: i32) -> usize {
        let (x, y, z) = ((x + 1) as usize, (y + 1) as usize, (z + 1) as usize);
        (x * dim + y) * dim + z
    }

    #[inline]
    fn is_solid(&self, x: i32, y: i32, z: i32) -> bool {
        self.solid[Self::index(self.dim, x, y, z)]
    }
}

/// Mesh one region of the density field.
///
/// Vertex positions are relative to `request.center`. Buffers are reserved for
/// the worst case (every face of every voxel) and trimmed before returning.
pub fn mesh_region<N: NoiseSource>(field: &DensityField<N>, request: &RegionRequest) -> RegionMesh {
    debug_assert!(request.resolution <= MAX_RESOLUTION);
    let r = request.resolution as i32;
    let cells = (request.resolution as usize).pow(3);
    let grid = SampleGrid::sample(field, request);

    let step = request.voxel_size();
    let half = request.scale * 0.5;
    let mut mesh = RegionMesh::with_worst_case_capacity(request.center, request.bounds(), cells);

    for x in 0..r {
        for y in 0..r {
            for z in 0..r {
                if !grid.is_solid(x, y, z) {
                    continue;
                }

                let origin = [
                    (x as f64 * step - half) as f32,
                    (y as f64 * step - half) as f32,
                    (z as f64 * step - half) as f32,
                ];
                for direction in FaceDirection::ALL {
                    let (nx, ny, nz) = direction.offset(x, y, z);
                    if !grid.is_solid(nx, ny, nz) {
                        mesh.push_quad(
                            direction,
                            [x as u32, y as u32, z as u32],
                            origin,
                            step as f32,
                        );
                    }
                }
            }
        }
    }

    mesh.trim();
    mesh
}
