//! Task and message types exchanged between workers and the supervisor

use crate::checker::CheckReport;
use std::fmt;

/// Unique identifier of a check task, stable across requeues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Identifier of a worker slot; survives worker replacement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId(pub usize);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// A single site check to be executed by a worker
///
/// Immutable once enqueued, except `retry_count` which the supervisor
/// increments on requeue.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub site_name: String,
    pub url: String,
    pub depth: u32,
    pub retry_count: u32,
}

/// Classification of a permanently failed task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The check exceeded its deadline
    Timeout,

    /// Network or parse failure inside the page checker
    Crawl,

    /// The worker died without reporting an outcome
    WorkerCrash,

    /// The session was aborted before the task resolved
    Aborted,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Crawl => write!(f, "crawl error"),
            Self::WorkerCrash => write!(f, "worker crash"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Message sent from workers (or their exit monitors) to the supervisor
#[derive(Debug)]
pub enum Outcome {
    /// Task completed; the site was checked
    Success {
        task_id: TaskId,
        payload: CheckReport,
    },

    /// Task resolved as failed
    Failure {
        task_id: TaskId,
        error: FailureKind,
    },

    /// Worker finished its task, breached the memory ceiling, and is
    /// exiting cleanly; a replacement should be spawned
    RestartRequest {
        worker_id: WorkerId,
        memory_mb: u64,
    },

    /// Worker died without reporting, detected via its join notification
    Crashed {
        worker_id: WorkerId,
        task_id: Option<TaskId>,
    },
}
