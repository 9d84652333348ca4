//! Batched job orchestration: run the compute half of many (begin, apply)
//! pairs on a worker pool, wait for the whole batch, then apply the results in
//! submission order on the calling thread.

mod error;
mod executor;
mod orchestrator;
mod pool;

pub use error::JobError;
pub use executor::{Executor, InlineExecutor, TaskHandle, Work, wait_all};
pub use orchestrator::{BatchGate, BeginFn, JobOrchestrator, OrchestratorConfig};
pub use pool::WorkerPool;
