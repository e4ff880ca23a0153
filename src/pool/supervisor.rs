//! Worker supervisor
//!
//! The supervisor owns the fixed-size worker set and consumes the result
//! channel in a single-threaded control loop. It routes task outcomes to the
//! progress aggregator, executes the restart protocol for memory-breached
//! workers, replaces crashed workers, and drives shutdown once the queue is
//! drained.

use crate::checker::{CheckFlags, PageChecker};
use crate::config::PoolConfig;
use crate::pool::memory::MemoryProbe;
use crate::pool::progress::{ProgressAggregator, SessionReport};
use crate::pool::queue::TaskQueue;
use crate::pool::task::{FailureKind, Outcome, Task, TaskId, WorkerId};
use crate::pool::worker::{self, WorkerContext, WorkerExit, WorkerSettings, WorkerState};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::AbortHandle;

/// How a worker's lifecycle ended, delivered by its exit monitor
#[derive(Debug)]
enum ExitNotice {
    /// Worker returned from its loop on its own
    Clean(WorkerExit),

    /// Worker panicked; a `Crashed` outcome was already reported
    Crashed,

    /// Worker was force-terminated by the supervisor
    Aborted,
}

/// Supervisor-side view of one worker slot
struct WorkerHandle {
    state: WorkerState,
    last_memory_mb: u64,
    abort: AbortHandle,
    exit_rx: oneshot::Receiver<ExitNotice>,
}

/// Owns the worker set and runs the session control loop
pub struct Supervisor {
    concurrency: usize,
    retry_budget: u32,
    grace: Duration,
    settings: WorkerSettings,
    tasks: Vec<Task>,
    queue: Arc<TaskQueue>,
    results_tx: mpsc::Sender<Outcome>,
    results_rx: mpsc::Receiver<Outcome>,
    workers: HashMap<WorkerId, WorkerHandle>,
    /// Unresolved tasks: queued or in flight
    pending: HashMap<TaskId, Task>,
    aggregator: ProgressAggregator,
    checker: Arc<dyn PageChecker>,
    probe: Arc<dyn MemoryProbe>,
    abort_rx: watch::Receiver<bool>,
    abort_open: bool,
    draining: bool,
}

impl Supervisor {
    /// Creates a supervisor for one session
    ///
    /// # Arguments
    ///
    /// * `pool` - Worker pool configuration
    /// * `flags` - Per-check behavior flags handed to every worker
    /// * `tasks` - The full task list, in site-list order
    /// * `checker` - Page checker shared by all workers
    /// * `probe` - Memory probe shared by all workers
    /// * `abort_rx` - Global abort signal; flipping it to true drains the session
    pub fn new(
        pool: &PoolConfig,
        flags: CheckFlags,
        tasks: Vec<Task>,
        checker: Arc<dyn PageChecker>,
        probe: Arc<dyn MemoryProbe>,
        abort_rx: watch::Receiver<bool>,
    ) -> Self {
        let concurrency = pool.concurrency as usize;
        let (results_tx, results_rx) = mpsc::channel(concurrency * 2 + 8);

        Self {
            concurrency,
            retry_budget: pool.retry_budget,
            grace: Duration::from_secs(pool.grace_period_secs),
            settings: WorkerSettings {
                task_timeout: Duration::from_secs(pool.task_timeout_secs),
                max_memory_mb: pool.max_memory_mb,
                flags,
            },
            tasks,
            queue: Arc::new(TaskQueue::new()),
            results_tx,
            results_rx,
            workers: HashMap::new(),
            pending: HashMap::new(),
            aggregator: ProgressAggregator::new(0),
            checker,
            probe,
            abort_rx,
            abort_open: true,
            draining: false,
        }
    }

    /// Runs the session to completion and returns the aggregate report
    ///
    /// The session always terminates: either with a complete aggregate
    /// (possibly containing failed entries) or, after an abort signal, with
    /// unresolved tasks recorded as `Aborted`.
    pub async fn run(mut self) -> SessionReport {
        let tasks = std::mem::take(&mut self.tasks);
        self.aggregator = ProgressAggregator::new(tasks.len() as u64);

        tracing::info!(
            tasks = tasks.len(),
            workers = self.concurrency,
            "session started"
        );

        for task in tasks {
            self.pending.insert(task.id, task.clone());
            self.queue.enqueue(task);
        }

        for i in 0..self.concurrency {
            self.spawn_worker(WorkerId(i));
        }

        while !self.pending.is_empty() {
            debug_assert!(self.draining || self.workers.len() == self.concurrency);

            tokio::select! {
                changed = self.abort_rx.changed(), if self.abort_open && !self.draining => {
                    match changed {
                        Ok(()) if *self.abort_rx.borrow() => self.begin_drain(),
                        Ok(()) => {}
                        Err(_) => self.abort_open = false,
                    }
                }
                outcome = self.results_rx.recv() => {
                    match outcome {
                        Some(outcome) => self.handle_outcome(outcome).await,
                        // Unreachable while we hold a sender clone, but do
                        // not hang if it ever happens.
                        None => break,
                    }
                }
            }
        }

        self.shutdown().await
    }

    /// Routes one message from the result channel
    async fn handle_outcome(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Success { task_id, payload } => {
                if let Some(task) = self.pending.remove(&task_id) {
                    tracing::debug!(task = %task_id, site = %task.site_name, "task succeeded");
                    self.aggregator.observe_success(&task, &payload);
                    self.log_progress();
                }
            }

            Outcome::Failure { task_id, error } => {
                self.resolve_failure(task_id, error);
            }

            Outcome::RestartRequest {
                worker_id,
                memory_mb,
            } => {
                self.replace_worker(worker_id, memory_mb).await;
            }

            Outcome::Crashed { worker_id, task_id } => {
                tracing::warn!(worker = %worker_id, task = ?task_id, "worker crashed");
                self.workers.remove(&worker_id);
                if let Some(task_id) = task_id {
                    self.resolve_failure(task_id, FailureKind::WorkerCrash);
                }
                if !self.draining {
                    self.spawn_worker(worker_id);
                }
            }
        }
    }

    /// Requeues a failed task while retry budget remains, otherwise records
    /// it as permanently failed
    fn resolve_failure(&mut self, task_id: TaskId, kind: FailureKind) {
        let Some(mut task) = self.pending.remove(&task_id) else {
            return;
        };

        if !self.draining && task.retry_count < self.retry_budget {
            task.retry_count += 1;
            self.aggregator.record_retry();
            tracing::info!(
                task = %task_id,
                site = %task.site_name,
                error = %kind,
                attempt = task.retry_count + 1,
                "requeueing task"
            );
            self.pending.insert(task_id, task.clone());
            self.queue.enqueue(task);
        } else {
            tracing::warn!(task = %task_id, site = %task.site_name, error = %kind, "task failed");
            self.aggregator.observe_failure(&task, kind);
            self.log_progress();
        }
    }

    /// Executes the restart protocol for a memory-breached worker
    ///
    /// The worker already finished and reported its last task, so it is
    /// expected to exit on its own; stragglers are force-terminated after
    /// the grace period. A replacement with the same id is then spawned.
    async fn replace_worker(&mut self, worker_id: WorkerId, memory_mb: u64) {
        let Some(mut handle) = self.workers.remove(&worker_id) else {
            return;
        };
        handle.state = WorkerState::Restarting;
        handle.last_memory_mb = memory_mb;
        self.aggregator.record_restart();
        tracing::info!(
            worker = %worker_id,
            memory_mb = handle.last_memory_mb,
            "recycling worker"
        );

        match tokio::time::timeout(self.grace, &mut handle.exit_rx).await {
            Ok(_) => tracing::debug!(worker = %worker_id, "worker exited cleanly"),
            Err(_) => {
                tracing::warn!(
                    worker = %worker_id,
                    grace_secs = self.grace.as_secs(),
                    "worker did not exit within grace period, force-terminating"
                );
                handle.abort.abort();
            }
        }

        if !self.draining {
            self.spawn_worker(worker_id);
        }
    }

    /// Switches to draining mode after a global abort
    ///
    /// Queued tasks are resolved as `Aborted`; workers receive sentinels and
    /// exit after finishing their in-flight task; no replacements are
    /// spawned from here on.
    fn begin_drain(&mut self) {
        tracing::warn!("abort signal received, draining session");
        self.draining = true;

        for task in self.queue.clear() {
            if let Some(task) = self.pending.remove(&task.id) {
                self.aggregator.observe_failure(&task, FailureKind::Aborted);
            }
        }
        for _ in 0..self.workers.len() {
            self.queue.push_drain();
        }
        self.log_progress();
    }

    /// Terminates all workers and finalizes the session
    async fn shutdown(mut self) -> SessionReport {
        tracing::debug!(workers = self.workers.len(), "terminating workers");

        for _ in 0..self.workers.len() {
            self.queue.push_drain();
        }

        for (id, mut handle) in self.workers.drain() {
            match tokio::time::timeout(self.grace, &mut handle.exit_rx).await {
                // A breach on the worker's final task leaves its restart
                // request unconsumed; still count the recycle.
                Ok(Ok(ExitNotice::Clean(WorkerExit::Recycling))) => {
                    self.aggregator.record_restart();
                }
                Ok(_) => {}
                Err(_) => {
                    tracing::warn!(worker = %id, "worker did not terminate in time, aborting");
                    handle.abort.abort();
                }
            }
            handle.state = WorkerState::Terminated;
            tracing::trace!(worker = %id, state = ?handle.state, "worker terminated");
        }

        let state = self.aggregator.snapshot();
        tracing::info!(
            processed = state.processed,
            succeeded = state.succeeded,
            failed = state.failed,
            retries = state.retries_used,
            restarts = state.restarts,
            "session finished"
        );

        self.aggregator.finalize()
    }

    /// Spawns a worker plus its exit monitor into the given slot
    fn spawn_worker(&mut self, id: WorkerId) {
        let current_task = Arc::new(Mutex::new(None));
        let ctx = WorkerContext {
            id,
            queue: self.queue.clone(),
            results: self.results_tx.clone(),
            checker: self.checker.clone(),
            probe: self.probe.clone(),
            settings: self.settings,
            current_task: current_task.clone(),
        };

        let join = tokio::spawn(worker::run(ctx));
        let abort = join.abort_handle();
        let (exit_tx, exit_rx) = oneshot::channel();
        let crash_tx = self.results_tx.clone();
        let slot = current_task;

        // Exit monitor: turns the join result into a crash report on the
        // result channel or a clean-exit notice for the supervisor.
        tokio::spawn(async move {
            let notice = match join.await {
                Ok(exit) => ExitNotice::Clean(exit),
                Err(e) if e.is_panic() => {
                    let task_id = slot.lock().unwrap().take();
                    let _ = crash_tx
                        .send(Outcome::Crashed {
                            worker_id: id,
                            task_id,
                        })
                        .await;
                    ExitNotice::Crashed
                }
                Err(_) => ExitNotice::Aborted,
            };
            let _ = exit_tx.send(notice);
        });

        self.workers.insert(
            id,
            WorkerHandle {
                state: WorkerState::Idle,
                last_memory_mb: 0,
                abort,
                exit_rx,
            },
        );
        tracing::debug!(worker = %id, "worker spawned");
    }

    fn log_progress(&self) {
        let s = self.aggregator.snapshot();
        tracing::info!(
            processed = s.processed,
            total = s.total,
            succeeded = s.succeeded,
            failed = s.failed,
            "progress"
        );
    }
}
