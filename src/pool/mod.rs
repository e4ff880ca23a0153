//! Worker pool orchestration
//!
//! Runs a session of site checks under a fixed worker budget:
//! - A shared FIFO [`TaskQueue`] feeds tokio-task workers
//! - Workers report every outcome over a single result channel
//! - The [`supervisor`] recycles memory-breached workers, replaces crashed
//!   ones, requeues failed tasks within the retry budget, and drains the
//!   session on a global abort signal
//! - The [`ProgressAggregator`] keeps the session counters consistent

mod memory;
mod progress;
mod queue;
mod supervisor;
mod task;
mod worker;

pub use memory::{MemoryProbe, ProcessMemoryProbe};
pub use progress::{ProgressAggregator, SessionReport, SessionState, TaskRecord, TaskStatus};
pub use queue::{QueueItem, TaskQueue};
pub use task::{FailureKind, Outcome, Task, TaskId, WorkerId};
pub use worker::WorkerState;

use crate::checker::{CheckFlags, PageChecker};
use crate::config::Config;
use std::sync::Arc;
use supervisor::Supervisor;
use tokio::sync::watch;

/// Handle used to abort a running session
///
/// Triggering is idempotent; the session finishes its in-flight tasks and
/// records everything still queued as aborted.
pub struct SessionAbort(watch::Sender<bool>);

impl SessionAbort {
    pub fn trigger(&self) {
        let _ = self.0.send(true);
    }
}

/// Creates an abort handle and the receiver to hand to [`run_session`]
pub fn abort_channel() -> (SessionAbort, watch::Receiver<bool>) {
    let (tx, rx) = watch::channel(false);
    (SessionAbort(tx), rx)
}

/// Builds the task list from the configured sites, in file order
pub fn tasks_from_sites(config: &Config) -> Vec<Task> {
    config
        .sites
        .iter()
        .enumerate()
        .map(|(i, site)| Task {
            id: TaskId(i as u64),
            site_name: site.name.clone(),
            url: site.url.clone(),
            depth: site.effective_depth(config.checker.depth),
            retry_count: 0,
        })
        .collect()
}

/// Runs one complete check session and returns its aggregate report
///
/// # Arguments
///
/// * `config` - Validated configuration; one task is created per site
/// * `checker` - Page checker executed by every worker
/// * `probe` - Memory probe sampled by workers after each task
/// * `abort` - Receiver from [`abort_channel`]; flipping it to true drains
///   the session instead of stopping it abruptly
pub async fn run_session(
    config: &Config,
    checker: Arc<dyn PageChecker>,
    probe: Arc<dyn MemoryProbe>,
    abort: watch::Receiver<bool>,
) -> SessionReport {
    let tasks = tasks_from_sites(config);
    let flags = CheckFlags {
        save_artifacts: config.checker.save_artifacts,
        follow_pagination: config.checker.follow_pagination,
    };
    let supervisor = Supervisor::new(&config.pool, flags, tasks, checker, probe, abort);
    supervisor.run().await
}
