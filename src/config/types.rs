use serde::Deserialize;

/// Main configuration structure for sitepulse
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub pool: PoolConfig,
    pub checker: CheckerConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "site")]
    pub sites: Vec<SiteEntry>,
}

/// Worker pool behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    /// Number of concurrent check workers
    pub concurrency: u32,

    /// Per-worker resident memory ceiling in megabytes.
    /// A ceiling of 0 recycles the worker after every task.
    #[serde(rename = "max-memory-mb")]
    pub max_memory_mb: u64,

    /// Maximum number of requeues allowed per task before it is
    /// recorded as permanently failed
    #[serde(rename = "retry-budget", default = "default_retry_budget")]
    pub retry_budget: u32,

    /// Deadline for a single site check (seconds)
    #[serde(rename = "task-timeout-secs", default = "default_task_timeout")]
    pub task_timeout_secs: u64,

    /// How long the supervisor waits for a recycling worker to exit
    /// before force-terminating it (seconds)
    #[serde(rename = "grace-period-secs", default = "default_grace_period")]
    pub grace_period_secs: u64,
}

/// Page checker behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CheckerConfig {
    /// Maximum link depth to follow from each site root
    pub depth: u32,

    /// Follow pagination URLs; when false, URLs differing only in
    /// pagination query parameters are treated as duplicates
    #[serde(rename = "follow-pagination", default = "default_true")]
    pub follow_pagination: bool,

    /// Save fetched HTML under the artifacts directory
    #[serde(rename = "save-artifacts", default)]
    pub save_artifacts: bool,

    /// Upper bound on pages fetched per site
    #[serde(rename = "page-cap", default = "default_page_cap")]
    pub page_cap: u32,

    /// Per-request HTTP timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// User agent string sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the markdown session report
    #[serde(rename = "report-path")]
    pub report_path: String,

    /// Directory for intermediate artifacts (saved HTML)
    #[serde(rename = "artifacts-dir", default = "default_artifacts_dir")]
    pub artifacts_dir: String,
}

/// A site to be checked
#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    /// Human-readable site name used in the report
    pub name: String,

    /// Site root URL
    pub url: String,

    /// Optional per-site depth override; wins only when smaller than
    /// the global depth
    #[serde(default)]
    pub depth: Option<u32>,
}

fn default_retry_budget() -> u32 {
    1
}

fn default_task_timeout() -> u64 {
    300
}

fn default_grace_period() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_page_cap() -> u32 {
    200
}

fn default_request_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("sitepulse/{}", env!("CARGO_PKG_VERSION"))
}

fn default_artifacts_dir() -> String {
    "./artifacts".to_string()
}

impl SiteEntry {
    /// Resolves the effective crawl depth for this site.
    ///
    /// The site-level override is honored only when it is smaller than the
    /// global depth, so a site can restrict its own crawl but never widen it.
    pub fn effective_depth(&self, global_depth: u32) -> u32 {
        match self.depth {
            Some(d) => d.min(global_depth),
            None => global_depth,
        }
    }
}
