//! Executor abstraction: submit units of work, get back handles to wait on.

use crossbeam_channel::{Receiver, TryRecvError};

use crate::JobError;

/// A boxed unit of work runnable on any thread.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// Something that can run work, on this thread or elsewhere.
pub trait Executor {
    /// Queue `work` for execution.
    fn spawn(&self, work: Work) -> Result<(), JobError>;

    /// Run `work` and return a handle that yields its output.
    fn dispatch<O, F>(&self, work: F) -> Result<TaskHandle<O>, JobError>
    where
        Self: Sized,
        O: Send + 'static,
        F: FnOnce() -> O + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.spawn(Box::new(move || {
            // The handle may already be gone; nothing to report then.
            let _ = tx.send(work());
        }))?;
        Ok(TaskHandle::new(rx))
    }
}

/// Handle to the output of one dispatched unit of work.
pub struct TaskHandle<O> {
    receiver: Receiver<O>,
    output: Option<O>,
    lost: bool,
}

impl<O> TaskHandle<O> {
    fn new(receiver: Receiver<O>) -> Self {
        Self {
            receiver,
            output: None,
            lost: false,
        }
    }

    /// Returns `true` once the work has finished, successfully or not.
    /// Never blocks.
    pub fn is_finished(&mut self) -> bool {
        if self.output.is_some() || self.lost {
            return true;
        }
        match self.receiver.try_recv() {
            Ok(output) => {
                self.output = Some(output);
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                self.lost = true;
                true
            }
        }
    }

    /// Block until the work finishes and return its output.
    pub fn wait(self) -> Result<O, JobError> {
        if let Some(output) = self.output {
            return Ok(output);
        }
        if self.lost {
            return Err(JobError::WorkerLost { lost: 1 });
        }
        self.receiver
            .recv()
            .map_err(|_| JobError::WorkerLost { lost: 1 })
    }
}

/// Block until every handle has finished.
///
/// All handles are waited on before any error is reported, so no unit of the
/// batch is still running when this returns. Results keep submission order;
/// lost units come back as `None`.
pub fn wait_all<O>(handles: Vec<TaskHandle<O>>) -> Vec<Option<O>> {
    handles.into_iter().map(|h| h.wait().ok()).collect()
}

/// Runs work immediately on the calling thread.
///
/// Useful for tests and single-threaded hosts; results are ready as soon as
/// `dispatch` returns.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn spawn(&self, work: Work) -> Result<(), JobError> {
        work();
        Ok(())
    }
}
