//! Markdown report generation
//!
//! This module renders a finished session as a human-readable markdown
//! report with overall statistics and a per-site result table.

use crate::pool::{SessionReport, TaskStatus};
use crate::Result;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown report for a finished session
///
/// # Arguments
///
/// * `report` - The aggregate session report
/// * `config_hash` - Hash of the configuration the session ran under
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(PulseError)` - Failed to create or write the file
pub fn write_markdown_report(
    report: &SessionReport,
    config_hash: &str,
    output_path: &Path,
) -> Result<()> {
    let markdown = format_markdown_report(report, config_hash);

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a session report as markdown
pub fn format_markdown_report(report: &SessionReport, config_hash: &str) -> String {
    let mut md = String::new();

    md.push_str("# Sitepulse Session Report\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!(
        "- **Started**: {}\n",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    md.push_str(&format!(
        "- **Finished**: {}\n",
        report.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    let duration = report.finished_at - report.started_at;
    md.push_str(&format!("- **Duration**: {} seconds\n", duration.num_seconds()));
    md.push_str(&format!("- **Config Hash**: {}\n\n", config_hash));

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Sites Checked**: {}\n", report.total));
    md.push_str(&format!("- **Succeeded**: {}\n", report.succeeded));
    md.push_str(&format!("- **Failed**: {}\n", report.failed));
    md.push_str(&format!("- **Retries Used**: {}\n", report.retries_used));
    md.push_str(&format!("- **Worker Restarts**: {}\n", report.restarts));
    let success_rate = if report.total > 0 {
        (report.succeeded as f64 / report.total as f64) * 100.0
    } else {
        0.0
    };
    md.push_str(&format!("- **Success Rate**: {:.2}%\n\n", success_rate));

    md.push_str("## Site Results\n\n");
    md.push_str("| Site | URL | Status | Pages | Page Errors | Attempts | Detail |\n");
    md.push_str("|------|-----|--------|-------|-------------|----------|--------|\n");
    for record in &report.results {
        let (status, detail) = match record.status {
            TaskStatus::Succeeded => (
                "ok",
                record.title.clone().unwrap_or_else(|| "-".to_string()),
            ),
            TaskStatus::Failed => (
                "failed",
                record
                    .error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
        };
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} |\n",
            record.site_name,
            record.url,
            status,
            record.pages_checked,
            record.pages_failed,
            record.attempts,
            detail
        ));
    }
    md.push('\n');

    md
}
