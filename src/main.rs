//! Sitepulse main entry point
//!
//! This is the command-line interface for the sitepulse website health
//! checker.

use clap::Parser;
use sitepulse::checker::HttpChecker;
use sitepulse::config::load_config_with_hash;
use sitepulse::pool::{abort_channel, run_session, ProcessMemoryProbe};
use sitepulse::report::{print_summary, write_markdown_report};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Sitepulse: a resource-aware website health checker
///
/// Sitepulse checks a configured list of websites by crawling each one to a
/// bounded depth under a fixed worker budget, recycling workers that grow
/// past a memory ceiling, and writing a consolidated markdown report.
#[derive(Parser, Debug)]
#[command(name = "sitepulse")]
#[command(version = "1.0.0")]
#[command(about = "A resource-aware website health checker", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be checked without running
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_session(config, &config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitepulse=info,warn"),
            1 => EnvFilter::new("sitepulse=debug,info"),
            2 => EnvFilter::new("sitepulse=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would run
fn handle_dry_run(config: &sitepulse::Config) {
    println!("=== Sitepulse Dry Run ===\n");

    println!("Pool Configuration:");
    println!("  Concurrency: {}", config.pool.concurrency);
    println!("  Memory ceiling: {} MB", config.pool.max_memory_mb);
    println!("  Retry budget: {}", config.pool.retry_budget);
    println!("  Task timeout: {}s", config.pool.task_timeout_secs);
    println!("  Grace period: {}s", config.pool.grace_period_secs);

    println!("\nChecker Configuration:");
    println!("  Depth: {}", config.checker.depth);
    println!("  Page cap: {}", config.checker.page_cap);
    println!("  Follow pagination: {}", config.checker.follow_pagination);
    println!("  Save artifacts: {}", config.checker.save_artifacts);
    println!("  Request timeout: {}s", config.checker.request_timeout_secs);
    println!("  User agent: {}", config.checker.user_agent);

    println!("\nOutput:");
    println!("  Report: {}", config.output.report_path);
    println!("  Artifacts: {}", config.output.artifacts_dir);

    println!("\nSites ({}):", config.sites.len());
    for site in &config.sites {
        println!(
            "  - {} ({}) depth {}",
            site.name,
            site.url,
            site.effective_depth(config.checker.depth)
        );
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would check {} sites", config.sites.len());
}

/// Handles the main check session
async fn handle_session(
    config: sitepulse::Config,
    config_hash: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Checking {} sites with {} workers",
        config.sites.len(),
        config.pool.concurrency
    );

    let checker = Arc::new(HttpChecker::new(
        &config.checker,
        Path::new(&config.output.artifacts_dir),
    )?);
    let probe = Arc::new(ProcessMemoryProbe::new()?);

    let (abort, abort_rx) = abort_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Ctrl-C received, aborting session");
            abort.trigger();
        }
    });

    let report = run_session(&config, checker, probe, abort_rx).await;

    print_summary(&report);

    let report_path = Path::new(&config.output.report_path);
    write_markdown_report(&report, config_hash, report_path)?;
    println!("✓ Report written to: {}", config.output.report_path);

    Ok(())
}
