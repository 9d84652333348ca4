//! Job execution error types.

/// Errors raised while dispatching or collecting jobs.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// The executor no longer accepts work (it has been shut down).
    #[error("executor is shut down")]
    ExecutorClosed,

    /// Tasks finished without delivering a result (the work panicked).
    #[error("{lost} task(s) were lost before delivering a result")]
    WorkerLost {
        /// Number of tasks in the batch that produced no output.
        lost: usize,
    },

    /// A worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}
