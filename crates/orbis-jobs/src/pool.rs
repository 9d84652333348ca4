//! Fixed-size worker thread pool fed through a channel.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use tracing::{debug, error};

use crate::JobError;
use crate::executor::{Executor, Work};

/// A pool of named worker threads pulling work from a shared queue.
///
/// A panicking unit of work is caught so the worker keeps serving the queue;
/// the matching [`TaskHandle`](crate::TaskHandle) reports it as lost.
pub struct WorkerPool {
    /// Channel sender for submitting work to workers.
    sender: Option<Sender<Work>>,
    /// Handles to the worker threads (for shutdown).
    workers: Vec<JoinHandle<()>>,
    /// Units queued or executing.
    in_flight: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Spawn `thread_count` workers (at least one).
    pub fn new(thread_count: usize) -> Result<Self, JobError> {
        let thread_count = thread_count.max(1);
        let (sender, receiver) = crossbeam_channel::unbounded::<Work>();
        let in_flight = Arc::new(AtomicUsize::new(0));

        let mut workers = Vec::with_capacity(thread_count);
        for index in 0..thread_count {
            let receiver = receiver.clone();
            let in_flight = Arc::clone(&in_flight);

            let handle = std::thread::Builder::new()
                .name(format!("orbis-worker-{index}"))
                .spawn(move || {
                    while let Ok(work) = receiver.recv() {
                        if catch_unwind(AssertUnwindSafe(work)).is_err() {
                            error!("job panicked on worker {index}");
                        }
                        in_flight.fetch_sub(1, Ordering::AcqRel);
                    }
                })
                .map_err(JobError::Spawn)?;
            workers.push(handle);
        }

        debug!("started worker pool with {thread_count} threads");
        Ok(Self {
            sender: Some(sender),
            workers,
            in_flight,
        })
    }

    /// Create a pool sized from the CPU count, leaving headroom for the main
    /// and render threads.
    pub fn with_defaults() -> Result<Self, JobError> {
        let cpus = num_cpus::get().max(2);
        Self::new((cpus - 2).max(1))
    }

    /// Number of worker threads.
    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }

    /// Number of units currently queued or executing.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Stop accepting work, let workers finish the queue, and join them.
    pub fn shutdown(&mut self) {
        // Dropping the sender closes the channel once the queue is empty.
        self.sender.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Executor for WorkerPool {
    fn spawn(&self, work: Work) -> Result<(), JobError> {
        let sender = self.sender.as_ref().ok_or(JobError::ExecutorClosed)?;
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        sender.send(work).map_err(|_| {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            JobError::ExecutorClosed
        })
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
