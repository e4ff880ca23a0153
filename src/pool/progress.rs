//! Session progress accounting
//!
//! The aggregator owns all mutable session counters; workers never touch
//! them directly. Every task resolves exactly once into a succeeded or
//! failed record, so `processed == succeeded + failed` holds at every
//! observation point.

use crate::checker::CheckReport;
use crate::pool::task::{FailureKind, Task};
use chrono::{DateTime, Utc};

/// Final status of a resolved task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Succeeded,
    Failed,
}

/// Per-site result carried into the session report
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub site_name: String,
    pub url: String,
    pub status: TaskStatus,
    pub error: Option<FailureKind>,
    /// Total attempts, including the first
    pub attempts: u32,
    pub pages_checked: u32,
    pub pages_failed: u32,
    pub title: Option<String>,
}

/// Running tally of session counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionState {
    pub total: u64,
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub retries_used: u64,
    pub restarts: u64,
}

/// Aggregate result of a completed session, handed to the report layer
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub retries_used: u64,
    pub restarts: u64,
    /// Per-site records in completion order
    pub results: Vec<TaskRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Accumulates outcomes into session state and per-task records
pub struct ProgressAggregator {
    state: SessionState,
    records: Vec<TaskRecord>,
    started_at: DateTime<Utc>,
}

impl ProgressAggregator {
    pub fn new(total: u64) -> Self {
        Self {
            state: SessionState {
                total,
                ..SessionState::default()
            },
            records: Vec::with_capacity(total as usize),
            started_at: Utc::now(),
        }
    }

    /// Records a task as succeeded
    pub fn observe_success(&mut self, task: &Task, payload: &CheckReport) {
        self.records.push(TaskRecord {
            site_name: task.site_name.clone(),
            url: task.url.clone(),
            status: TaskStatus::Succeeded,
            error: None,
            attempts: task.retry_count + 1,
            pages_checked: payload.pages_checked,
            pages_failed: payload.pages_failed,
            title: payload.title.clone(),
        });
        self.state.processed += 1;
        self.state.succeeded += 1;
        debug_assert_eq!(self.state.processed, self.state.succeeded + self.state.failed);
    }

    /// Records a task as permanently failed
    pub fn observe_failure(&mut self, task: &Task, kind: FailureKind) {
        self.records.push(TaskRecord {
            site_name: task.site_name.clone(),
            url: task.url.clone(),
            status: TaskStatus::Failed,
            error: Some(kind),
            attempts: task.retry_count + 1,
            pages_checked: 0,
            pages_failed: 0,
            title: None,
        });
        self.state.processed += 1;
        self.state.failed += 1;
        debug_assert_eq!(self.state.processed, self.state.succeeded + self.state.failed);
    }

    /// Records a requeue of a failed or crashed task
    pub fn record_retry(&mut self) {
        self.state.retries_used += 1;
    }

    /// Records a memory-triggered worker recycle
    pub fn record_restart(&mut self) {
        self.state.restarts += 1;
    }

    /// Current counters, for progress reporting
    pub fn snapshot(&self) -> SessionState {
        self.state
    }

    /// Consumes the aggregator and produces the final report
    pub fn finalize(self) -> SessionReport {
        SessionReport {
            total: self.state.total,
            succeeded: self.state.succeeded,
            failed: self.state.failed,
            retries_used: self.state.retries_used,
            restarts: self.state.restarts,
            results: self.records,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}
