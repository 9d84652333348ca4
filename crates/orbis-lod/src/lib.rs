//! Adaptive octree level of detail for a voxel planet.
//!
//! [`LodTree`] subdivides toward the viewer and prunes behind it, one bounded
//! step per frame. Leaves that owe geometry are meshed on worker threads
//! through a [`JobOrchestrator`](orbis_jobs::JobOrchestrator) and the results
//! are attached back to their nodes on the frame thread. [`PlanetLod`] wires
//! the pieces into a per-frame update.

mod driver;
mod error;
mod node;
mod params;
mod tree;

pub use driver::{FrameMode, FrameReport, PlanetLod};
pub use error::LodError;
pub use node::{NodeId, NodeState, OCTANT_OFFSETS, TreeNode};
pub use params::{LodParams, MAX_DIVISIONS, SubdivisionTrigger};
pub use tree::{ApplyOutcome, LodStats, LodTree, TraverseReport};
