//! End-to-end session tests
//!
//! These tests drive `run_session` with scripted checkers and probes so the
//! supervisor, queue, workers, and aggregator are exercised together without
//! touching the network.

use async_trait::async_trait;
use sitepulse::checker::{CheckError, CheckFlags, CheckReport, PageChecker};
use sitepulse::config::{CheckerConfig, Config, OutputConfig, PoolConfig, SiteEntry};
use sitepulse::pool::{
    abort_channel, run_session, FailureKind, MemoryProbe, SessionAbort, TaskStatus,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn config(concurrency: u32, max_memory_mb: u64, site_names: &[&str]) -> Config {
    Config {
        pool: PoolConfig {
            concurrency,
            max_memory_mb,
            retry_budget: 1,
            task_timeout_secs: 5,
            grace_period_secs: 5,
        },
        checker: CheckerConfig {
            depth: 1,
            follow_pagination: true,
            save_artifacts: false,
            page_cap: 10,
            request_timeout_secs: 5,
            user_agent: "sitepulse-test".to_string(),
        },
        output: OutputConfig {
            report_path: "./report.md".to_string(),
            artifacts_dir: "./artifacts".to_string(),
        },
        sites: site_names
            .iter()
            .map(|name| SiteEntry {
                name: name.to_string(),
                url: format!("https://{}.example.com/", name),
                depth: None,
            })
            .collect(),
    }
}

fn ok_report(url: &str) -> CheckReport {
    CheckReport {
        final_url: url.to_string(),
        title: Some("ok".to_string()),
        pages_checked: 1,
        pages_failed: 0,
        links_found: 0,
    }
}

/// Probe returning a fixed reading
struct FixedProbe(u64);

impl MemoryProbe for FixedProbe {
    fn resident_mb(&self) -> u64 {
        self.0
    }
}

/// Probe that reports a breach on the first sample only
struct BreachOnceProbe {
    breached: AtomicBool,
}

impl BreachOnceProbe {
    fn new() -> Self {
        Self {
            breached: AtomicBool::new(false),
        }
    }
}

impl MemoryProbe for BreachOnceProbe {
    fn resident_mb(&self) -> u64 {
        if self.breached.swap(true, Ordering::SeqCst) {
            10
        } else {
            512
        }
    }
}

/// Checker that succeeds for every site
struct AlwaysOk;

#[async_trait]
impl PageChecker for AlwaysOk {
    async fn check(
        &self,
        url: &str,
        _depth: u32,
        _flags: CheckFlags,
    ) -> Result<CheckReport, CheckError> {
        Ok(ok_report(url))
    }
}

/// Checker that fails sites whose URL contains a marker substring
struct FailMatching {
    marker: &'static str,
    error: fn() -> CheckError,
}

#[async_trait]
impl PageChecker for FailMatching {
    async fn check(
        &self,
        url: &str,
        _depth: u32,
        _flags: CheckFlags,
    ) -> Result<CheckReport, CheckError> {
        if url.contains(self.marker) {
            Err((self.error)())
        } else {
            Ok(ok_report(url))
        }
    }
}

/// Checker that panics a configured number of times per matching URL
struct PanicBudget {
    marker: &'static str,
    panics_left: Mutex<HashMap<String, u32>>,
    budget: u32,
}

impl PanicBudget {
    fn new(marker: &'static str, budget: u32) -> Self {
        Self {
            marker,
            panics_left: Mutex::new(HashMap::new()),
            budget,
        }
    }
}

#[async_trait]
impl PageChecker for PanicBudget {
    async fn check(
        &self,
        url: &str,
        _depth: u32,
        _flags: CheckFlags,
    ) -> Result<CheckReport, CheckError> {
        if url.contains(self.marker) {
            let mut panics = self.panics_left.lock().unwrap();
            let left = panics.entry(url.to_string()).or_insert(self.budget);
            if *left > 0 {
                *left -= 1;
                drop(panics);
                panic!("scripted checker panic for {}", url);
            }
        }
        Ok(ok_report(url))
    }
}

/// Checker that aborts the session from inside its first check, so the
/// triggering task is still in flight when the drain begins
struct AbortingOk {
    abort: Mutex<Option<SessionAbort>>,
}

#[async_trait]
impl PageChecker for AbortingOk {
    async fn check(
        &self,
        url: &str,
        _depth: u32,
        _flags: CheckFlags,
    ) -> Result<CheckReport, CheckError> {
        if let Some(abort) = self.abort.lock().unwrap().take() {
            abort.trigger();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(ok_report(url))
    }
}

#[tokio::test]
async fn test_all_sites_succeed() {
    let config = config(2, 100, &["a", "b", "c", "d", "e"]);
    let (_abort, abort_rx) = abort_channel();

    let report = run_session(
        &config,
        Arc::new(AlwaysOk),
        Arc::new(FixedProbe(10)),
        abort_rx,
    )
    .await;

    assert_eq!(report.total, 5);
    assert_eq!(report.succeeded, 5);
    assert_eq!(report.failed, 0);
    assert_eq!(report.retries_used, 0);
    assert_eq!(report.restarts, 0);
    assert_eq!(report.results.len(), 5);
}

#[tokio::test]
async fn test_failing_site_retried_then_recorded() {
    let config = config(2, 100, &["a", "bad", "c"]);
    let (_abort, abort_rx) = abort_channel();

    let checker = FailMatching {
        marker: "bad",
        error: || CheckError::Timeout,
    };
    let report = run_session(
        &config,
        Arc::new(checker),
        Arc::new(FixedProbe(10)),
        abort_rx,
    )
    .await;

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.retries_used, 1);

    let failed = report
        .results
        .iter()
        .find(|r| r.status == TaskStatus::Failed)
        .unwrap();
    assert_eq!(failed.site_name, "bad");
    assert_eq!(failed.error, Some(FailureKind::Timeout));
    // Retry budget of 1 allows two attempts in total
    assert_eq!(failed.attempts, 2);
}

#[tokio::test]
async fn test_crawl_errors_consume_retry_budget_too() {
    let config = config(1, 100, &["bad"]);
    let (_abort, abort_rx) = abort_channel();

    let checker = FailMatching {
        marker: "bad",
        error: || CheckError::Network("connection refused".to_string()),
    };
    let report = run_session(
        &config,
        Arc::new(checker),
        Arc::new(FixedProbe(10)),
        abort_rx,
    )
    .await;

    assert_eq!(report.failed, 1);
    assert_eq!(report.retries_used, 1);
    assert_eq!(report.results[0].error, Some(FailureKind::Crawl));
}

#[tokio::test]
async fn test_memory_breach_recycles_worker_without_losing_tasks() {
    let config = config(1, 256, &["a", "b", "c"]);
    let (_abort, abort_rx) = abort_channel();

    let report = run_session(
        &config,
        Arc::new(AlwaysOk),
        Arc::new(BreachOnceProbe::new()),
        abort_rx,
    )
    .await;

    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed, 0);
    assert_eq!(report.restarts, 1);
}

#[tokio::test]
async fn test_zero_ceiling_recycles_after_every_task() {
    let config = config(1, 0, &["a", "b", "c", "d", "e"]);
    let (_abort, abort_rx) = abort_channel();

    let report = run_session(
        &config,
        Arc::new(AlwaysOk),
        Arc::new(FixedProbe(50)),
        abort_rx,
    )
    .await;

    assert_eq!(report.succeeded, 5);
    assert_eq!(report.failed, 0);
    assert_eq!(report.restarts, 5);
}

#[tokio::test]
async fn test_crashing_task_fails_after_budget_and_pool_recovers() {
    let config = config(2, 100, &["a", "crash", "c"]);
    let (_abort, abort_rx) = abort_channel();

    // Panics on every attempt; the task burns its retry and is recorded as
    // a worker crash while the other sites still complete.
    let checker = PanicBudget::new("crash", u32::MAX);
    let report = run_session(
        &config,
        Arc::new(checker),
        Arc::new(FixedProbe(10)),
        abort_rx,
    )
    .await;

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.retries_used, 1);

    let crashed = report
        .results
        .iter()
        .find(|r| r.status == TaskStatus::Failed)
        .unwrap();
    assert_eq!(crashed.site_name, "crash");
    assert_eq!(crashed.error, Some(FailureKind::WorkerCrash));
    assert_eq!(crashed.attempts, 2);
}

#[tokio::test]
async fn test_crash_once_then_succeed_on_retry() {
    let config = config(1, 100, &["flaky"]);
    let (_abort, abort_rx) = abort_channel();

    let checker = PanicBudget::new("flaky", 1);
    let report = run_session(
        &config,
        Arc::new(checker),
        Arc::new(FixedProbe(10)),
        abort_rx,
    )
    .await;

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(report.retries_used, 1);
    assert_eq!(report.results[0].attempts, 2);
}

#[tokio::test]
async fn test_abort_drains_queued_tasks_but_finishes_in_flight() {
    let config = config(1, 100, &["a", "b", "c"]);
    let (abort, abort_rx) = abort_channel();

    let checker = AbortingOk {
        abort: Mutex::new(Some(abort)),
    };
    let report = run_session(
        &config,
        Arc::new(checker),
        Arc::new(FixedProbe(10)),
        abort_rx,
    )
    .await;

    assert_eq!(report.total, 3);
    assert_eq!(report.succeeded + report.failed, 3);

    let aborted = report
        .results
        .iter()
        .filter(|r| r.error == Some(FailureKind::Aborted))
        .count();
    assert_eq!(aborted, 2);
    assert_eq!(report.succeeded, 1);
}

#[tokio::test]
async fn test_abort_before_start_resolves_everything_as_aborted() {
    let config = config(2, 100, &["a", "b", "c"]);
    let (abort, abort_rx) = abort_channel();
    abort.trigger();

    let report = run_session(
        &config,
        Arc::new(AlwaysOk),
        Arc::new(FixedProbe(10)),
        abort_rx,
    )
    .await;

    assert_eq!(report.total, 3);
    assert_eq!(report.succeeded + report.failed, 3);
    // Every task resolves exactly once even when nothing ran
    assert!(report.failed >= 1);
    for record in report.results.iter().filter(|r| r.status == TaskStatus::Failed) {
        assert_eq!(record.error, Some(FailureKind::Aborted));
    }
}
