//! Per-frame driver tying the tree, the density field and the job system.

use std::sync::Arc;
use std::time::Instant;

use glam::DVec3;
use orbis_jobs::{Executor, JobOrchestrator, OrchestratorConfig};
use orbis_mesh::{Aabb, GeometryHandle, GeometrySink, RegionMesh};
use orbis_terrain::{DensityField, NoiseSource};
use tracing::{debug, warn};

use crate::LodError;
use crate::node::NodeId;
use crate::params::LodParams;
use crate::tree::{ApplyOutcome, LodStats, LodTree, TraverseReport};

/// How a frame consumes meshing results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrameMode {
    /// Dispatch and wait for the batch within the same frame.
    #[default]
    Blocking,
    /// Dispatch and return; apply batches in a later frame once complete.
    Pipelined,
}

/// What happened during one [`PlanetLod::update`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: u64,
    pub traverse: TraverseReport,
    /// Nodes handed to the job system this frame.
    pub scheduled: usize,
    /// Results that produced a geometry resource.
    pub attached: usize,
    /// Results consumed without producing geometry.
    pub discarded: usize,
    /// A new batch was held back by the orchestrator's gate.
    pub gated: bool,
}

#[derive(Default)]
struct ApplyTally {
    attached: usize,
    discarded: usize,
}

impl ApplyTally {
    fn record(&mut self, outcome: ApplyOutcome) {
        match outcome {
            ApplyOutcome::Attached(_) => self.attached += 1,
            _ => self.discarded += 1,
        }
    }
}

/// A voxel planet: LOD tree, density field and meshing pipeline.
pub struct PlanetLod<N: NoiseSource, E: Executor> {
    tree: LodTree,
    field: Arc<DensityField<N>>,
    orchestrator: JobOrchestrator<NodeId, RegionMesh, E>,
    mode: FrameMode,
    frame: u64,
}

impl<N, E> PlanetLod<N, E>
where
    N: NoiseSource + 'static,
    E: Executor,
{
    pub fn new(
        params: LodParams,
        field: DensityField<N>,
        executor: E,
        jobs: OrchestratorConfig,
        mode: FrameMode,
    ) -> Result<Self, LodError> {
        Ok(Self {
            tree: LodTree::new(params)?,
            field: Arc::new(field),
            orchestrator: JobOrchestrator::new(executor, jobs),
            mode,
            frame: 0,
        })
    }

    pub fn tree(&self) -> &LodTree {
        &self.tree
    }

    pub fn field(&self) -> &DensityField<N> {
        &self.field
    }

    pub fn mode(&self) -> FrameMode {
        self.mode
    }

    pub fn stats(&self) -> LodStats {
        self.tree.stats()
    }

    pub fn orchestrator(&self) -> &JobOrchestrator<NodeId, RegionMesh, E> {
        &self.orchestrator
    }

    /// Advance one frame for a viewer at `viewer`.
    pub fn update<S: GeometrySink>(
        &mut self,
        viewer: DVec3,
        sink: &mut S,
    ) -> Result<FrameReport, LodError> {
        let frame_start = Instant::now();
        self.frame += 1;
        let mut report = FrameReport {
            frame: self.frame,
            ..Default::default()
        };

        report.traverse = self.tree.traverse(viewer, sink);

        let mut tally = ApplyTally::default();
        if self.mode == FrameMode::Pipelined {
            self.orchestrator
                .try_apply(|id, mesh| tally.record(self.tree.apply(id, mesh, sink)))?;
        }

        if self.orchestrator.can_start_batch(frame_start) {
            report.scheduled = self.tree.schedule(&self.field, &mut self.orchestrator);
            self.orchestrator.dispatch()?;
        } else {
            report.gated = true;
        }

        if self.mode == FrameMode::Blocking {
            self.orchestrator
                .wait_and_apply(|id, mesh| tally.record(self.tree.apply(id, mesh, sink)))?;
        }

        report.attached = tally.attached;
        report.discarded = tally.discarded;
        debug!(
            "frame {}: +{} octet(s), -{} node(s), {} scheduled, {} attached, {} discarded{}",
            report.frame,
            report.traverse.created,
            report.traverse.pruned,
            report.scheduled,
            report.attached,
            report.discarded,
            if report.gated { ", gated" } else { "" }
        );
        Ok(report)
    }

    /// Geometry handles of the leaves that pass `is_visible`.
    pub fn visible_geometry<F>(&self, is_visible: F) -> Vec<GeometryHandle>
    where
        F: FnMut(&Aabb) -> bool,
    {
        self.tree.visible_geometry(is_visible)
    }

    /// Wait for every in-flight batch and apply it. Returns the number of
    /// results consumed.
    ///
    /// A failed dispatch is reported only after the batches already running
    /// have been applied; the refused units stay queued.
    pub fn drain<S: GeometrySink>(&mut self, sink: &mut S) -> Result<usize, LodError> {
        let dispatched = self.orchestrator.dispatch();
        let mut tally = ApplyTally::default();
        self.orchestrator
            .wait_and_apply(|id, mesh| tally.record(self.tree.apply(id, mesh, sink)))?;
        dispatched?;
        Ok(tally.attached + tally.discarded)
    }

    /// Drain outstanding work, then release every geometry resource.
    pub fn shutdown<S: GeometrySink>(&mut self, sink: &mut S) -> Result<usize, LodError> {
        let drained = self.drain(sink)?;
        if drained > 0 {
            debug!("drained {drained} result(s) before teardown");
        }
        let released = self.tree.teardown(sink)?;
        if !self.orchestrator.is_idle() {
            warn!("job orchestrator still has work after teardown");
        }
        Ok(released)
    }
}
