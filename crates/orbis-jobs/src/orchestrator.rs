//! Batch orchestration of (begin, apply) job pairs.
//!
//! During a tree walk the caller pushes one `(key, begin)` pair per unit of
//! work. [`JobOrchestrator::dispatch`] hands every pending `begin` to the
//! executor as one batch. Results are consumed batch by batch: a batch is only
//! applied once every unit in it has finished, and its outputs are handed to
//! the apply callback in submission order on the calling thread.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::JobError;
use crate::executor::{Executor, TaskHandle};

/// Compute half of a job: runs on a worker, produces the output to apply.
pub type BeginFn<O> = Box<dyn FnOnce() -> O + Send + 'static>;

/// Policy for starting a new batch while earlier ones are still running.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BatchGate {
    /// Start a new batch every time one is requested.
    #[default]
    Immediate,
    /// Defer new batches until every earlier batch has been applied.
    WaitForDrain,
}

/// Orchestrator tuning.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OrchestratorConfig {
    pub gate: BatchGate,
    /// Once this much of the frame has elapsed, no new batch is started.
    pub frame_budget: Option<Duration>,
}

struct Batch<K, O> {
    id: u64,
    keys: Vec<K>,
    handles: Vec<TaskHandle<Option<O>>>,
    dispatched_at: Instant,
}

/// Collects job pairs, runs their compute halves on an executor and applies
/// the results behind a per-batch barrier.
pub struct JobOrchestrator<K, O, E: Executor> {
    executor: E,
    config: OrchestratorConfig,
    pending: Vec<(K, BeginFn<O>)>,
    in_flight: VecDeque<Batch<K, O>>,
    next_batch_id: u64,
}

impl<K, O, E> JobOrchestrator<K, O, E>
where
    O: Send + 'static,
    E: Executor,
{
    pub fn new(executor: E, config: OrchestratorConfig) -> Self {
        Self {
            executor,
            config,
            pending: Vec::new(),
            in_flight: VecDeque::new(),
            next_batch_id: 0,
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Queue a job pair for the next batch.
    pub fn push<F>(&mut self, key: K, begin: F)
    where
        F: FnOnce() -> O + Send + 'static,
    {
        self.pending.push((key, Box::new(begin)));
    }

    /// Number of pairs pushed but not yet dispatched.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of dispatched batches not yet applied.
    pub fn in_flight_batches(&self) -> usize {
        self.in_flight.len()
    }

    /// Number of dispatched units not yet applied.
    pub fn in_flight_jobs(&self) -> usize {
        self.in_flight.iter().map(|b| b.keys.len()).sum()
    }

    /// Returns `true` when nothing is pending or in flight.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.in_flight.is_empty()
    }

    /// Whether a new batch may start in a frame that began at `frame_start`.
    ///
    /// Gating only ever defers new work; it never touches running batches.
    pub fn can_start_batch(&self, frame_start: Instant) -> bool {
        if self.config.gate == BatchGate::WaitForDrain && !self.in_flight.is_empty() {
            return false;
        }
        match self.config.frame_budget {
            Some(budget) => frame_start.elapsed() < budget,
            None => true,
        }
    }

    /// Submit every pending `begin` to the executor as one batch.
    ///
    /// Returns the number of units dispatched. On a submission failure the
    /// units already handed to the executor are still tracked, so their
    /// results are drained by the next apply. The unit that failed and every
    /// unit after it stay pending, in order, for a later dispatch.
    pub fn dispatch(&mut self) -> Result<usize, JobError> {
        if self.pending.is_empty() {
            return Ok(0);
        }

        let pending = std::mem::take(&mut self.pending);
        let mut keys = Vec::with_capacity(pending.len());
        let mut handles = Vec::with_capacity(pending.len());
        let mut failure = None;

        let mut queue = pending.into_iter();
        while let Some((key, begin)) = queue.next() {
            // The executor consumes the closure even when it refuses it, so
            // `begin` sits in a slot the refused unit can be recovered from.
            let slot = Arc::new(Mutex::new(Some(begin)));
            let work_slot = Arc::clone(&slot);
            let work = move || {
                let begin = work_slot.lock().ok()?.take();
                begin.map(|begin| begin())
            };
            match self.executor.dispatch(work) {
                Ok(handle) => {
                    keys.push(key);
                    handles.push(handle);
                }
                Err(err) => {
                    if let Some(begin) = slot.lock().ok().and_then(|mut s| s.take()) {
                        self.pending.push((key, begin));
                    }
                    self.pending.extend(queue);
                    failure = Some(err);
                    break;
                }
            }
        }

        let count = keys.len();
        let id = self.next_batch_id;
        self.next_batch_id += 1;
        if count > 0 {
            debug!("dispatched batch {id} with {count} job(s)");
            self.in_flight.push_back(Batch {
                id,
                keys,
                handles,
                dispatched_at: Instant::now(),
            });
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(count),
        }
    }

    /// Block until every in-flight batch has finished and apply all results.
    ///
    /// Batches are applied oldest first; within a batch `apply` runs in
    /// submission order, and only after every unit of that batch is done.
    /// Returns the number of results applied, or [`JobError::WorkerLost`]
    /// after applying the surviving results if any unit produced nothing.
    pub fn wait_and_apply<F>(&mut self, mut apply: F) -> Result<usize, JobError>
    where
        F: FnMut(K, O),
    {
        let mut applied = 0;
        let mut lost = 0;
        while let Some(batch) = self.in_flight.pop_front() {
            let (ok, missing) = Self::apply_batch(batch, &mut apply);
            applied += ok;
            lost += missing;
        }
        if lost > 0 {
            return Err(JobError::WorkerLost { lost });
        }
        Ok(applied)
    }

    /// Apply every batch at the front of the queue whose units have all
    /// finished. Never blocks and never applies part of a batch.
    pub fn try_apply<F>(&mut self, mut apply: F) -> Result<usize, JobError>
    where
        F: FnMut(K, O),
    {
        let mut applied = 0;
        let mut lost = 0;
        while let Some(front) = self.in_flight.front_mut() {
            if !front.handles.iter_mut().all(|h| h.is_finished()) {
                break;
            }
            let Some(batch) = self.in_flight.pop_front() else {
                break;
            };
            let (ok, missing) = Self::apply_batch(batch, &mut apply);
            applied += ok;
            lost += missing;
        }
        if lost > 0 {
            return Err(JobError::WorkerLost { lost });
        }
        Ok(applied)
    }

    /// Dispatch everything pending and apply it before returning.
    pub fn run_batch<F>(&mut self, apply: F) -> Result<usize, JobError>
    where
        F: FnMut(K, O),
    {
        self.dispatch()?;
        self.wait_and_apply(apply)
    }

    fn apply_batch<F>(batch: Batch<K, O>, apply: &mut F) -> (usize, usize)
    where
        F: FnMut(K, O),
    {
        let Batch {
            id,
            keys,
            handles,
            dispatched_at,
        } = batch;

        // Barrier: every unit is waited on before the first apply.
        let outputs = crate::executor::wait_all(handles);
        let outputs = outputs.into_iter().map(Option::flatten);

        let mut applied = 0;
        let mut lost = 0;
        for (key, output) in keys.into_iter().zip(outputs) {
            match output {
                Some(output) => {
                    apply(key, output);
                    applied += 1;
                }
                None => lost += 1,
            }
        }

        if lost > 0 {
            warn!("batch {id} lost {lost} job(s)");
        }
        debug!(
            "applied batch {id}: {applied} result(s) after {:.2}ms",
            dispatched_at.elapsed().as_secs_f64() * 1000.0
        );
        (applied, lost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InlineExecutor, Work, WorkerPool};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Runs work inline until `capacity` spawns have been accepted, then
    /// refuses everything.
    struct Limited {
        capacity: AtomicUsize,
    }

    impl Limited {
        fn new(capacity: usize) -> Self {
            Self {
                capacity: AtomicUsize::new(capacity),
            }
        }
    }

    impl Executor for Limited {
        fn spawn(&self, work: Work) -> Result<(), JobError> {
            let left = self.capacity.load(Ordering::SeqCst);
            if left == 0 {
                return Err(JobError::ExecutorClosed);
            }
            self.capacity.store(left - 1, Ordering::SeqCst);
            work();
            Ok(())
        }
    }

    fn inline() -> JobOrchestrator<usize, usize, InlineExecutor> {
        JobOrchestrator::new(InlineExecutor, OrchestratorConfig::default())
    }

    /// No apply runs while any unit of the same batch is still computing.
    #[test]
    fn test_strict_barrier_before_apply() {
        let pool = WorkerPool::new(4).unwrap();
        let mut orchestrator = JobOrchestrator::new(pool, OrchestratorConfig::default());
        let finished = Arc::new(AtomicUsize::new(0));
        let jobs = 16;

        for i in 0..jobs {
            let finished = Arc::clone(&finished);
            orchestrator.push(i, move || {
                std::thread::sleep(Duration::from_millis((i % 4) as u64 * 5));
                finished.fetch_add(1, Ordering::SeqCst);
                i * 2
            });
        }
        assert_eq!(orchestrator.dispatch().unwrap(), jobs);

        let mut calls = 0;
        let applied = orchestrator
            .wait_and_apply(|_, _| {
                assert_eq!(finished.load(Ordering::SeqCst), jobs);
                calls += 1;
            })
            .unwrap();
        assert_eq!(applied, jobs);
        assert_eq!(calls, jobs);
        assert!(orchestrator.is_idle());
    }

    #[test]
    fn test_apply_runs_in_submission_order() {
        let pool = WorkerPool::new(4).unwrap();
        let mut orchestrator = JobOrchestrator::new(pool, OrchestratorConfig::default());
        for i in 0..20usize {
            orchestrator.push(i, move || {
                // Later submissions finish first.
                std::thread::sleep(Duration::from_millis((20 - i) as u64));
                i
            });
        }

        let mut seen = Vec::new();
        orchestrator
            .run_batch(|key, output| {
                assert_eq!(key, output);
                seen.push(key);
            })
            .unwrap();
        assert_eq!(seen, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_batch_list_cleared_after_apply() {
        let mut orchestrator = inline();
        orchestrator.push(1, || 10);
        orchestrator.push(2, || 20);
        assert_eq!(orchestrator.pending_len(), 2);

        orchestrator.dispatch().unwrap();
        assert_eq!(orchestrator.pending_len(), 0);
        assert_eq!(orchestrator.in_flight_batches(), 1);
        assert_eq!(orchestrator.in_flight_jobs(), 2);

        orchestrator.wait_and_apply(|_, _| {}).unwrap();
        assert_eq!(orchestrator.in_flight_batches(), 0);
        assert_eq!(orchestrator.wait_and_apply(|_, _| {}).unwrap(), 0);
    }

    #[test]
    fn test_dispatch_with_nothing_pending() {
        let mut orchestrator = inline();
        assert_eq!(orchestrator.dispatch().unwrap(), 0);
        assert_eq!(orchestrator.in_flight_batches(), 0);
    }

    /// try_apply leaves a batch alone until its slowest unit is done.
    #[test]
    fn test_try_apply_never_applies_partial_batch() {
        let pool = WorkerPool::new(2).unwrap();
        let mut orchestrator = JobOrchestrator::new(pool, OrchestratorConfig::default());
        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(1);

        orchestrator.push(0, || 0usize);
        orchestrator.push(1, move || {
            let _ = release_rx.recv();
            1usize
        });
        orchestrator.dispatch().unwrap();

        // The fast unit has certainly finished by now; the slow one is parked.
        std::thread::sleep(Duration::from_millis(20));
        let mut applied = Vec::new();
        assert_eq!(orchestrator.try_apply(|k, _| applied.push(k)).unwrap(), 0);
        assert!(applied.is_empty());
        assert_eq!(orchestrator.in_flight_batches(), 1);

        release_tx.send(()).unwrap();
        orchestrator.wait_and_apply(|k, _| applied.push(k)).unwrap();
        assert_eq!(applied, vec![0, 1]);
    }

    #[test]
    fn test_try_apply_applies_finished_batches() {
        let mut orchestrator = inline();
        orchestrator.push(7, || 70);
        orchestrator.dispatch().unwrap();
        orchestrator.push(8, || 80);
        orchestrator.dispatch().unwrap();

        let mut applied = Vec::new();
        let count = orchestrator.try_apply(|k, o| applied.push((k, o))).unwrap();
        assert_eq!(count, 2);
        assert_eq!(applied, vec![(7, 70), (8, 80)]);
    }

    #[test]
    fn test_wait_for_drain_defers_new_batch() {
        let config = OrchestratorConfig {
            gate: BatchGate::WaitForDrain,
            frame_budget: None,
        };
        let mut orchestrator: JobOrchestrator<usize, usize, _> =
            JobOrchestrator::new(InlineExecutor, config);
        let now = Instant::now();
        assert!(orchestrator.can_start_batch(now));

        orchestrator.push(0, || 0);
        orchestrator.dispatch().unwrap();
        assert!(!orchestrator.can_start_batch(now));

        orchestrator.wait_and_apply(|_, _| {}).unwrap();
        assert!(orchestrator.can_start_batch(now));
    }

    #[test]
    fn test_immediate_gate_allows_overlap() {
        let mut orchestrator = inline();
        orchestrator.push(0, || 0);
        orchestrator.dispatch().unwrap();
        assert!(orchestrator.can_start_batch(Instant::now()));
    }

    #[test]
    fn test_frame_budget_defers_new_batch() {
        let config = OrchestratorConfig {
            gate: BatchGate::Immediate,
            frame_budget: Some(Duration::from_millis(5)),
        };
        let orchestrator: JobOrchestrator<usize, usize, _> =
            JobOrchestrator::new(InlineExecutor, config);
        assert!(orchestrator.can_start_batch(Instant::now()));

        let frame_start = Instant::now();
        std::thread::sleep(Duration::from_millis(10));
        assert!(!orchestrator.can_start_batch(frame_start));
    }

    #[test]
    fn test_lost_unit_reported_after_applying_survivors() {
        let pool = WorkerPool::new(2).unwrap();
        let mut orchestrator = JobOrchestrator::new(pool, OrchestratorConfig::default());
        orchestrator.push(0, || 0usize);
        orchestrator.push(1, || -> usize { panic!("mesher failed") });
        orchestrator.push(2, || 2usize);
        orchestrator.dispatch().unwrap();

        let mut applied = Vec::new();
        let result = orchestrator.wait_and_apply(|k, _| applied.push(k));
        assert!(matches!(result, Err(JobError::WorkerLost { lost: 1 })));
        assert_eq!(applied, vec![0, 2]);
        assert!(orchestrator.is_idle());
    }

    #[test]
    fn test_refused_units_stay_pending() {
        let mut orchestrator = JobOrchestrator::new(Limited::new(1), OrchestratorConfig::default());
        for i in 0..4usize {
            orchestrator.push(i, move || i * 10);
        }

        assert!(matches!(
            orchestrator.dispatch(),
            Err(JobError::ExecutorClosed)
        ));
        assert_eq!(orchestrator.in_flight_jobs(), 1);
        assert_eq!(orchestrator.pending_len(), 3);

        // Once the executor accepts work again, every unit is applied once,
        // in the order it was pushed.
        orchestrator.executor().capacity.store(usize::MAX, Ordering::SeqCst);
        orchestrator.dispatch().unwrap();
        let mut applied = Vec::new();
        orchestrator
            .wait_and_apply(|k, o| applied.push((k, o)))
            .unwrap();
        assert_eq!(applied, vec![(0, 0), (1, 10), (2, 20), (3, 30)]);
        assert!(orchestrator.is_idle());
    }
}
