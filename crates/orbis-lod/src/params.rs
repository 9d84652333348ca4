//! LOD tree parameters and their validation.

use glam::DVec3;
use orbis_mesh::MAX_RESOLUTION;

use crate::LodError;

/// Deepest supported tree. Keeps `2^(level-1)` exact in an `f64` scale and
/// the node count of a full path well within the arena's `u32` ids.
pub const MAX_DIVISIONS: u32 = 30;

/// How the viewer's proximity to a node is tested.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SubdivisionTrigger {
    /// Viewer inside an axis-aligned box around the node centre.
    #[default]
    Box,
    /// Viewer within a sphere around the node centre.
    Sphere,
}

/// Parameters controlling how the tree grows and shrinks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LodParams {
    /// Division level of the root. Leaves sit at level 1.
    pub max_divisions: u32,
    /// Voxels per edge of every node's mesh.
    pub resolution: u32,
    /// Edge length of a voxel at level 1.
    pub voxel_size: f64,
    /// Subdivision half-extent as a multiple of the node's edge length.
    pub radius_multiplier: f64,
    /// Extra half-extent added at every level, in world units.
    pub inner_padding: f64,
    /// Upper bound on parents that gain children in one traversal.
    pub max_creations_per_frame: usize,
    /// World-space centre of the root node.
    pub root_center: DVec3,
    pub trigger: SubdivisionTrigger,
}

impl Default for LodParams {
    fn default() -> Self {
        Self {
            max_divisions: 10,
            resolution: 16,
            voxel_size: 1.0,
            radius_multiplier: 1.0,
            inner_padding: 0.0,
            max_creations_per_frame: 8,
            root_center: DVec3::ZERO,
            trigger: SubdivisionTrigger::Box,
        }
    }
}

impl LodParams {
    /// Edge length of a node at `division_level`.
    pub fn node_scale(&self, division_level: u32) -> f64 {
        let level = division_level.max(1) - 1;
        self.voxel_size * self.resolution as f64 * f64::from(2u32.pow(level.min(MAX_DIVISIONS)))
    }

    /// Edge length of the root node.
    pub fn root_scale(&self) -> f64 {
        self.node_scale(self.max_divisions)
    }

    /// Half-extent of the subdivision region around a node of edge `scale`.
    pub fn subdivision_half_extent(&self, scale: f64) -> f64 {
        scale * self.radius_multiplier + self.inner_padding
    }

    /// Check every parameter, reporting the first one out of range.
    pub fn validate(&self) -> Result<(), LodError> {
        if self.max_divisions == 0 || self.max_divisions > MAX_DIVISIONS {
            return Err(invalid(
                "max_divisions",
                format!("must be in 1..={MAX_DIVISIONS}, got {}", self.max_divisions),
            ));
        }
        if self.resolution == 0 || self.resolution > MAX_RESOLUTION {
            return Err(invalid(
                "resolution",
                format!("must be in 1..={MAX_RESOLUTION}, got {}", self.resolution),
            ));
        }
        if !(self.voxel_size.is_finite() && self.voxel_size > 0.0) {
            return Err(invalid(
                "voxel_size",
                format!("must be finite and positive, got {}", self.voxel_size),
            ));
        }
        if !(self.radius_multiplier.is_finite() && self.radius_multiplier >= 0.0) {
            return Err(invalid(
                "radius_multiplier",
                format!("must be finite and non-negative, got {}", self.radius_multiplier),
            ));
        }
        if !(self.inner_padding.is_finite() && self.inner_padding >= 0.0) {
            return Err(invalid(
                "inner_padding",
                format!("must be finite and non-negative, got {}", self.inner_padding),
            ));
        }
        if self.max_creations_per_frame == 0 {
            return Err(invalid(
                "max_creations_per_frame",
                "must be at least 1".to_string(),
            ));
        }
        if !self.root_center.is_finite() {
            return Err(invalid("root_center", "must be finite".to_string()));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: String) -> LodError {
    LodError::InvalidParams { field, reason }
}
