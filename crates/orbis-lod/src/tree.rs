//! The octree: arena storage, per-frame subdivision and pruning, meshing
//! schedule, and result application.

use std::sync::Arc;

use glam::DVec3;
use orbis_jobs::{Executor, JobOrchestrator};
use orbis_mesh::{Aabb, GeometryHandle, GeometrySink, RegionMesh, mesh_region};
use orbis_terrain::{DensityField, NoiseSource};
use tracing::{debug, trace, warn};

use crate::LodError;
use crate::node::{NodeId, NodeState, OCTANT_OFFSETS, TreeNode};
use crate::params::{LodParams, SubdivisionTrigger};

/// What one call to [`LodTree::traverse`] changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraverseReport {
    /// Parents that gained eight children.
    pub created: usize,
    /// Descendant nodes removed by pruning.
    pub pruned: usize,
    /// Nodes examined.
    pub visited: usize,
}

/// Result of handing a finished mesh back to the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Geometry was created and attached to the node.
    Attached(GeometryHandle),
    /// The region has no surface; the node is done but holds no geometry.
    Empty,
    /// The node was cleared or subdivided while its job ran; result dropped.
    Stale,
    /// The node had been pruned; result dropped and its slot freed.
    Retired,
    /// No scheduled node matches the id.
    Unknown,
}

/// Snapshot of the tree's shape and meshing state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LodStats {
    pub nodes: usize,
    pub leaves: usize,
    pub scheduled: usize,
    pub retired: usize,
    pub with_geometry: usize,
    /// Leaves that still owe a mesh for their current region.
    pub awaiting_mesh: usize,
    /// Lowest division level present (1 means the finest level is reached).
    pub finest_level: u32,
}

/// Octree of planet regions refined around a viewer.
pub struct LodTree {
    params: LodParams,
    nodes: Vec<Option<TreeNode>>,
    free: Vec<u32>,
    root: NodeId,
}

impl LodTree {
    /// Create a tree holding only the root, which owes its first mesh.
    pub fn new(params: LodParams) -> Result<Self, LodError> {
        params.validate()?;
        let mut tree = Self {
            params,
            nodes: Vec::new(),
            free: Vec::new(),
            root: NodeId(0),
        };
        tree.root = tree.alloc(Self::fresh_root(&params));
        debug!(
            "created LOD tree: {} levels, root scale {}",
            params.max_divisions,
            params.root_scale()
        );
        Ok(tree)
    }

    fn fresh_root(params: &LodParams) -> TreeNode {
        TreeNode::new(
            params.max_divisions,
            [0, 0, 0],
            None,
            params.root_center,
            params.root_scale(),
        )
    }

    pub fn params(&self) -> &LodParams {
        &self.params
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Every live node, including retired ones, in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &TreeNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|n| (NodeId(i as u32), n)))
    }

    /// Number of live node slots.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// World-space centre of a node.
    pub fn world_position(&self, id: NodeId) -> Option<DVec3> {
        self.node(id).map(|n| n.center)
    }

    /// World-space bounds of a node.
    pub fn bounds(&self, id: NodeId) -> Option<Aabb> {
        self.node(id).map(TreeNode::bounds)
    }

    fn alloc(&mut self, node: TreeNode) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                self.nodes[index as usize] = Some(node);
                NodeId(index)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId((self.nodes.len() - 1) as u32)
            }
        }
    }

    fn release_slot(&mut self, id: NodeId) {
        if let Some(slot) = self.nodes.get_mut(id.index()) {
            if slot.take().is_some() {
                self.free.push(id.0);
            }
        }
    }

    /// Whether the viewer is close enough for `node` to need children.
    pub fn should_subdivide(&self, node: &TreeNode, viewer: DVec3) -> bool {
        let half_extent = self.params.subdivision_half_extent(node.scale);
        let delta = viewer - node.center;
        match self.params.trigger {
            SubdivisionTrigger::Box => delta.abs().max_element() < half_extent,
            SubdivisionTrigger::Sphere => delta.length() < half_extent,
        }
    }

    /// Grow the tree toward `viewer` and prune it away from it.
    ///
    /// At most `max_creations_per_frame` parents gain children per call, and
    /// the children of a node are only descended into while that budget
    /// lasts, so growth is spread over frames. Pruning is never limited.
    pub fn traverse<S: GeometrySink>(&mut self, viewer: DVec3, sink: &mut S) -> TraverseReport {
        let budget = self.params.max_creations_per_frame;
        let mut report = TraverseReport::default();
        let mut stack = vec![self.root];

        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            report.visited += 1;
            if node.division_level <= 1 {
                continue;
            }

            let subdivide = self.should_subdivide(node, viewer);
            let has_children = !node.is_leaf();

            if subdivide {
                if !has_children {
                    if report.created >= budget {
                        continue;
                    }
                    self.subdivide(id, sink);
                    report.created += 1;
                }
                if report.created < budget {
                    if let Some(children) = self.node(id).and_then(|n| n.children) {
                        stack.extend(children.into_iter().rev());
                    }
                }
            } else if has_children {
                report.pruned += self.prune_children(id, sink);
            }
        }

        if report.created > 0 || report.pruned > 0 {
            debug!(
                "traverse: created {} octet(s), pruned {} node(s), visited {}",
                report.created, report.pruned, report.visited
            );
        }
        report
    }

    /// Clear `id` and give it eight children one level down.
    fn subdivide<S: GeometrySink>(&mut self, id: NodeId, sink: &mut S) {
        let Some(node) = self.node_mut(id) else {
            return;
        };
        if let Some(handle) = node.clear() {
            sink.release_geometry(handle);
        }
        let level = node.division_level - 1;
        let center = node.center;
        let scale = self.params.node_scale(level);

        let children = OCTANT_OFFSETS.map(|octant| {
            let child_center = TreeNode::child_center(center, octant, scale);
            self.alloc(TreeNode::new(level, octant, Some(id), child_center, scale))
        });
        if let Some(node) = self.node_mut(id) {
            node.children = Some(children);
        }
        trace!("subdivided node {id:?} into level {level}");
    }

    /// Remove every descendant of `id`, releasing their geometry, and make
    /// `id` a leaf again. Returns the number of nodes removed.
    ///
    /// Descendants still being meshed are retired rather than freed; their
    /// slots are reclaimed when the result comes back through [`apply`].
    ///
    /// [`apply`]: Self::apply
    pub fn prune_children<S: GeometrySink>(&mut self, id: NodeId, sink: &mut S) -> usize {
        let Some(children) = self.node_mut(id).and_then(|n| n.children.take()) else {
            return 0;
        };

        // Pre-order collection, processed in reverse so children go first.
        let mut order = Vec::new();
        let mut stack: Vec<NodeId> = children.to_vec();
        while let Some(child) = stack.pop() {
            order.push(child);
            if let Some(grandchildren) = self.node(child).and_then(|n| n.children) {
                stack.extend(grandchildren);
            }
        }

        for &child in order.iter().rev() {
            let Some(node) = self.node_mut(child) else {
                continue;
            };
            node.children = None;
            node.parent = None;
            if let Some(handle) = node.geometry.take() {
                sink.release_geometry(handle);
            }
            if node.is_scheduled() {
                node.retired = true;
                trace!("retired in-flight node {child:?}");
            } else {
                self.release_slot(child);
            }
        }

        trace!("pruned {} descendant(s) of {id:?}", order.len());
        order.len()
    }

    /// Claim every leaf that owes a mesh and queue its meshing job.
    ///
    /// Returns the number of nodes scheduled.
    pub fn schedule<N, E>(
        &mut self,
        field: &Arc<DensityField<N>>,
        orchestrator: &mut JobOrchestrator<NodeId, RegionMesh, E>,
    ) -> usize
    where
        N: NoiseSource + 'static,
        E: Executor,
    {
        let resolution = self.params.resolution;
        let mut scheduled = 0;
        let mut stack = vec![self.root];

        while let Some(id) = stack.pop() {
            let Some(node) = self.node_mut(id) else {
                continue;
            };
            if let Some(children) = node.children {
                stack.extend(children.into_iter().rev());
                continue;
            }
            if let Some(request) = node.try_schedule(resolution) {
                let field = Arc::clone(field);
                orchestrator.push(id, move || mesh_region(&field, &request));
                scheduled += 1;
            }
        }

        if scheduled > 0 {
            debug!("scheduled {scheduled} node(s) for meshing");
        }
        scheduled
    }

    /// Hand a finished mesh back to the node it was computed for.
    pub fn apply<S: GeometrySink>(
        &mut self,
        id: NodeId,
        mesh: RegionMesh,
        sink: &mut S,
    ) -> ApplyOutcome {
        let Some(node) = self.node_mut(id) else {
            warn!("mesh result for unknown node {id:?}");
            return ApplyOutcome::Unknown;
        };
        if node.state != NodeState::Scheduled {
            warn!("mesh result for node {id:?} that was not scheduled");
            return ApplyOutcome::Unknown;
        }
        node.state = NodeState::Idle;

        if node.retired {
            self.release_slot(id);
            return ApplyOutcome::Retired;
        }
        if node.needs_redraw || !node.is_leaf() {
            trace!("discarded stale mesh for node {id:?}");
            return ApplyOutcome::Stale;
        }

        if let Some(old) = node.geometry.take() {
            sink.release_geometry(old);
        }
        if mesh.is_empty() {
            return ApplyOutcome::Empty;
        }
        let handle = sink.create_geometry(mesh);
        node.geometry = Some(handle);
        ApplyOutcome::Attached(handle)
    }

    /// Geometry of every leaf whose bounds pass `is_visible`.
    ///
    /// Subtrees whose bounds fail the test are skipped whole.
    pub fn visible_geometry<F>(&self, mut is_visible: F) -> Vec<GeometryHandle>
    where
        F: FnMut(&Aabb) -> bool,
    {
        let mut visible = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            if !is_visible(&node.bounds()) {
                continue;
            }
            match node.children {
                Some(children) => stack.extend(children.into_iter().rev()),
                None => visible.extend(node.geometry),
            }
        }
        visible
    }

    /// Number of nodes with meshing in flight, retired ones included.
    pub fn scheduled_count(&self) -> usize {
        self.nodes().filter(|(_, n)| n.is_scheduled()).count()
    }

    pub fn stats(&self) -> LodStats {
        let mut stats = LodStats {
            finest_level: self.params.max_divisions,
            ..Default::default()
        };
        for (_, node) in self.nodes() {
            stats.nodes += 1;
            if node.retired {
                stats.retired += 1;
            } else if node.is_leaf() {
                stats.leaves += 1;
                if node.needs_redraw {
                    stats.awaiting_mesh += 1;
                }
            }
            if node.is_scheduled() {
                stats.scheduled += 1;
            }
            if node.geometry.is_some() {
                stats.with_geometry += 1;
            }
            stats.finest_level = stats.finest_level.min(node.division_level);
        }
        stats
    }

    /// Release all geometry and reset to a lone root.
    ///
    /// Every meshing job must have been applied first; otherwise nothing is
    /// touched and [`LodError::OutstandingWork`] is returned. Returns the
    /// number of geometry handles released.
    pub fn teardown<S: GeometrySink>(&mut self, sink: &mut S) -> Result<usize, LodError> {
        let scheduled = self.scheduled_count();
        if scheduled > 0 {
            return Err(LodError::OutstandingWork { scheduled });
        }

        let mut released = 0;
        for node in self.nodes.iter_mut().flatten() {
            if let Some(handle) = node.geometry.take() {
                sink.release_geometry(handle);
                released += 1;
            }
        }

        self.nodes.clear();
        self.free.clear();
        self.root = self.alloc(Self::fresh_root(&self.params));
        debug!("tore down LOD tree, released {released} geometry handle(s)");
        Ok(released)
    }
}
