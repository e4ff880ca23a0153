//! Page checking module
//!
//! The worker pool treats page checking as an opaque, potentially slow call
//! behind the [`PageChecker`] trait. The default implementation is
//! [`HttpChecker`], which fetches a site's root page and follows same-host
//! links breadth-first up to a configured depth.

mod http;

pub use http::{build_http_client, HttpChecker};

use thiserror::Error;

/// Per-call behavior flags passed to the checker alongside each task
#[derive(Debug, Clone, Copy)]
pub struct CheckFlags {
    /// Save fetched HTML to the artifacts directory
    pub save_artifacts: bool,

    /// Follow pagination URLs; when false they are treated as duplicates
    pub follow_pagination: bool,
}

/// Outcome of a successful site check
#[derive(Debug, Clone)]
pub struct CheckReport {
    /// URL after any redirects on the root page
    pub final_url: String,

    /// Title of the root page, if present
    pub title: Option<String>,

    /// Number of pages fetched during the check
    pub pages_checked: u32,

    /// Number of fetched pages that returned an error status
    pub pages_failed: u32,

    /// Total number of same-host links discovered
    pub links_found: u32,
}

/// Typed failure of a site check
///
/// Timeouts and network failures of the *root* page fail the whole check;
/// failures on deeper pages are tallied in [`CheckReport::pages_failed`].
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// A site checker invoked by pool workers
///
/// Implementations must be shareable across workers; any per-check state
/// belongs inside the `check` call itself.
#[async_trait::async_trait]
pub trait PageChecker: Send + Sync {
    /// Checks a site starting from `url`, following links to `depth`.
    async fn check(
        &self,
        url: &str,
        depth: u32,
        flags: CheckFlags,
    ) -> Result<CheckReport, CheckError>;
}
