//! Session result reporting
//!
//! Turns a finished session into a console summary and a markdown report
//! file listing every site with its outcome.

mod markdown;

pub use markdown::{format_markdown_report, write_markdown_report};

use crate::pool::{SessionReport, TaskStatus};

/// Prints a human-readable session summary to stdout
pub fn print_summary(report: &SessionReport) {
    println!("=== Session Summary ===\n");

    println!("Overview:");
    println!("  Sites checked: {}", report.total);
    println!("  Succeeded: {}", report.succeeded);
    println!("  Failed: {}", report.failed);
    println!("  Retries used: {}", report.retries_used);
    println!("  Worker restarts: {}", report.restarts);
    println!();

    let duration = report.finished_at - report.started_at;
    println!("  Duration: {} seconds", duration.num_seconds());
    println!();

    let failures: Vec<_> = report
        .results
        .iter()
        .filter(|r| r.status == TaskStatus::Failed)
        .collect();
    if !failures.is_empty() {
        println!("Failed Sites:");
        for record in failures {
            let reason = record
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            println!(
                "  {} ({}): {} after {} attempt(s)",
                record.site_name, record.url, reason, record.attempts
            );
        }
        println!();
    }
}
