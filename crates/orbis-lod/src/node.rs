//! Tree nodes and their meshing state machine.

use glam::DVec3;
use orbis_mesh::{Aabb, GeometryHandle, RegionRequest};

/// Child octant offsets, in the fixed order children are created.
///
/// Upper layer (`y = 1`) first, each layer walked the same way round.
pub const OCTANT_OFFSETS: [[u8; 3]; 8] = [
    [1, 1, 1],
    [0, 1, 1],
    [0, 1, 0],
    [1, 1, 0],
    [1, 0, 1],
    [0, 0, 1],
    [0, 0, 0],
    [1, 0, 0],
];

/// Index of a node in the tree's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Whether a meshing job is in flight for the node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NodeState {
    #[default]
    Idle,
    Scheduled,
}

/// One cubic region of the planet.
///
/// Lifecycle of a leaf: `needs_redraw` -> `Scheduled` -> geometry attached.
/// Subdividing clears the node back to `needs_redraw`.
#[derive(Clone, Debug)]
pub struct TreeNode {
    /// Distance from the bottom of the tree; leaves at the finest level are 1.
    pub division_level: u32,
    /// Position within the parent, each component 0 or 1. Zero for the root.
    pub octant: [u8; 3],
    pub parent: Option<NodeId>,
    /// Either none or all eight.
    pub children: Option<[NodeId; 8]>,
    pub state: NodeState,
    /// Set while the node owes a (re)mesh.
    pub needs_redraw: bool,
    pub geometry: Option<GeometryHandle>,
    /// Pruned while scheduled: detached from the tree, kept alive until its
    /// job result has been consumed.
    pub retired: bool,
    /// World-space centre.
    pub center: DVec3,
    /// Edge length in world units.
    pub scale: f64,
}

impl TreeNode {
    pub(crate) fn new(
        division_level: u32,
        octant: [u8; 3],
        parent: Option<NodeId>,
        center: DVec3,
        scale: f64,
    ) -> Self {
        Self {
            division_level,
            octant,
            parent,
            children: None,
            state: NodeState::Idle,
            needs_redraw: true,
            geometry: None,
            retired: false,
            center,
            scale,
        }
    }

    /// Centre of child `octant` of a node centred at `parent_center`.
    ///
    /// `child_scale` is the child's edge length, half the parent's.
    pub fn child_center(parent_center: DVec3, octant: [u8; 3], child_scale: f64) -> DVec3 {
        let offset = DVec3::new(
            f64::from(octant[0]),
            f64::from(octant[1]),
            f64::from(octant[2]),
        );
        parent_center + offset * child_scale - DVec3::splat(child_scale * 0.5)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn is_scheduled(&self) -> bool {
        self.state == NodeState::Scheduled
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_center_size(self.center, self.scale)
    }

    /// Claim the node for meshing.
    ///
    /// Succeeds only for an idle leaf that owes a redraw; the node then
    /// becomes `Scheduled` and the returned request describes its region.
    pub fn try_schedule(&mut self, resolution: u32) -> Option<RegionRequest> {
        if !self.is_leaf() || !self.needs_redraw || self.is_scheduled() || self.retired {
            return None;
        }
        self.state = NodeState::Scheduled;
        self.needs_redraw = false;
        Some(RegionRequest::new(self.center, self.scale, resolution))
    }

    /// Drop the node's geometry and mark it as owing a redraw.
    ///
    /// Returns the handle the caller must release.
    pub fn clear(&mut self) -> Option<GeometryHandle> {
        self.needs_redraw = true;
        self.geometry.take()
    }
}
