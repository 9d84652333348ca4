//! LOD error types.

use orbis_jobs::JobError;

/// Errors raised by the LOD tree and its frame driver.
#[derive(Debug, thiserror::Error)]
pub enum LodError {
    /// A parameter is outside its valid range.
    #[error("invalid LOD parameter `{field}`: {reason}")]
    InvalidParams {
        field: &'static str,
        reason: String,
    },

    /// The tree was torn down while meshing work was still outstanding.
    #[error("cannot tear down: {scheduled} node(s) still have meshing in flight")]
    OutstandingWork { scheduled: usize },

    /// The job system failed to run or deliver meshing work.
    #[error("job system error: {0}")]
    Job(#[from] JobError),
}
