//! Worker loop
//!
//! Each worker repeatedly pulls a task, runs the page checker under the task
//! deadline, reports exactly one outcome per task, then samples resident
//! memory. A breached ceiling ends the worker's lifecycle cleanly with a
//! restart request; a task already in flight is never interrupted for memory
//! reasons.

use crate::checker::{CheckError, CheckFlags, PageChecker};
use crate::pool::memory::MemoryProbe;
use crate::pool::queue::{QueueItem, TaskQueue};
use crate::pool::task::{FailureKind, Outcome, TaskId, WorkerId};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Lifecycle state of a worker slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Waiting for a task
    Idle,

    /// Executing a task
    Busy,

    /// Finished its last task and waiting to be replaced
    Restarting,

    /// Exited; only at shutdown is a slot left unreplaced
    Terminated,
}

/// Why a worker's loop ended on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerExit {
    /// Received a drain sentinel
    Drained,

    /// Memory ceiling breached after finishing a task
    Recycling,
}

/// Per-worker runtime settings, immutable for the worker's lifetime
#[derive(Debug, Clone, Copy)]
pub(crate) struct WorkerSettings {
    pub task_timeout: Duration,
    pub max_memory_mb: u64,
    pub flags: CheckFlags,
}

/// Everything a worker needs, handed over at spawn time
pub(crate) struct WorkerContext {
    pub id: WorkerId,
    pub queue: Arc<TaskQueue>,
    pub results: mpsc::Sender<Outcome>,
    pub checker: Arc<dyn PageChecker>,
    pub probe: Arc<dyn MemoryProbe>,
    pub settings: WorkerSettings,
    /// Task currently in flight, readable by the crash monitor
    pub current_task: Arc<Mutex<Option<TaskId>>>,
}

/// Runs the worker loop until drained or recycling
pub(crate) async fn run(ctx: WorkerContext) -> WorkerExit {
    tracing::debug!(worker = %ctx.id, "worker started");

    loop {
        let task = match ctx.queue.dequeue().await {
            QueueItem::Task(t) => t,
            QueueItem::Drain => {
                tracing::debug!(worker = %ctx.id, "drain sentinel received");
                return WorkerExit::Drained;
            }
        };

        *ctx.current_task.lock().unwrap() = Some(task.id);
        tracing::debug!(
            worker = %ctx.id,
            task = %task.id,
            site = %task.site_name,
            attempt = task.retry_count + 1,
            "task started"
        );

        let check = ctx
            .checker
            .check(&task.url, task.depth, ctx.settings.flags);
        let outcome = match tokio::time::timeout(ctx.settings.task_timeout, check).await {
            Ok(Ok(report)) => Outcome::Success {
                task_id: task.id,
                payload: report,
            },
            Ok(Err(CheckError::Timeout)) => Outcome::Failure {
                task_id: task.id,
                error: FailureKind::Timeout,
            },
            Ok(Err(e)) => {
                tracing::debug!(worker = %ctx.id, task = %task.id, error = %e, "check failed");
                Outcome::Failure {
                    task_id: task.id,
                    error: FailureKind::Crawl,
                }
            }
            Err(_) => Outcome::Failure {
                task_id: task.id,
                error: FailureKind::Timeout,
            },
        };

        if ctx.results.send(outcome).await.is_err() {
            // Supervisor is gone; nothing left to report to.
            return WorkerExit::Drained;
        }
        *ctx.current_task.lock().unwrap() = None;

        // Sample after completing and reporting, before requesting the next
        // task. A ceiling of 0 recycles unconditionally.
        let memory_mb = ctx.probe.resident_mb();
        if ctx.settings.max_memory_mb == 0 || memory_mb > ctx.settings.max_memory_mb {
            tracing::info!(
                worker = %ctx.id,
                memory_mb,
                ceiling_mb = ctx.settings.max_memory_mb,
                "memory ceiling breached, requesting restart"
            );
            let _ = ctx
                .results
                .send(Outcome::RestartRequest {
                    worker_id: ctx.id,
                    memory_mb,
                })
                .await;
            return WorkerExit::Recycling;
        }
    }
}
