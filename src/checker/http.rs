//! HTTP page checker implementation
//!
//! This module implements the default [`PageChecker`]: it fetches a site's
//! root page, extracts same-host links, and walks them breadth-first up to
//! the configured depth, tallying failed pages along the way. Errors are
//! classified into the typed [`CheckError`] taxonomy so the worker loop can
//! branch on data instead of exception propagation.

use crate::checker::{CheckError, CheckFlags, CheckReport, PageChecker};
use crate::config::CheckerConfig;
use reqwest::Client;
use scraper::{Html, Selector};
use sha2::{Digest, Sha256};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Query parameters that identify pagination variants of the same page
const PAGINATION_PARAMS: &[&str] = &["page", "p", "pg", "paged", "offset", "start"];

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent string to send with every request
/// * `request_timeout` - Per-request deadline
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    user_agent: &str,
    request_timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.to_string())
        .timeout(request_timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Result of fetching a single page
#[derive(Debug)]
enum FetchedPage {
    /// HTML page fetched successfully
    Html { final_url: String, body: String },

    /// Non-HTML content; counts as reachable but is not parsed
    NonHtml,

    /// Server answered with an error status
    HttpError { status: u16 },
}

/// Default HTTP-backed site checker
pub struct HttpChecker {
    client: Client,
    page_cap: u32,
    artifacts_dir: PathBuf,
}

impl HttpChecker {
    /// Creates a new HTTP checker from the checker configuration
    pub fn new(config: &CheckerConfig, artifacts_dir: &Path) -> Result<Self, reqwest::Error> {
        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.request_timeout_secs),
        )?;

        Ok(Self {
            client,
            page_cap: config.page_cap,
            artifacts_dir: artifacts_dir.to_path_buf(),
        })
    }

    /// Fetches a single page and classifies the result
    async fn fetch_page(&self, url: &Url) -> Result<FetchedPage, CheckError> {
        let response = match self.client.get(url.clone()).send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => return Err(CheckError::Timeout),
            Err(e) if e.is_connect() => {
                return Err(CheckError::Network(format!("connection failed: {}", e)))
            }
            Err(e) => return Err(CheckError::Network(e.to_string())),
        };

        let status = response.status();
        if !status.is_success() {
            return Ok(FetchedPage::HttpError {
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !content_type.contains("text/html") {
            return Ok(FetchedPage::NonHtml);
        }

        match response.text().await {
            Ok(body) => Ok(FetchedPage::Html { final_url, body }),
            Err(e) if e.is_timeout() => Err(CheckError::Timeout),
            Err(e) => Err(CheckError::Network(e.to_string())),
        }
    }

    /// Writes a fetched page body under the artifacts directory
    fn save_artifact(&self, url: &Url, body: &str) -> std::io::Result<PathBuf> {
        let host = url.host_str().unwrap_or("unknown");
        let dir = self.artifacts_dir.join(sanitize_host(host));
        std::fs::create_dir_all(&dir)?;

        let digest = Sha256::digest(url.as_str().as_bytes());
        let name = format!("{}.html", &hex::encode(digest)[..16]);
        let path = dir.join(name);
        std::fs::write(&path, body)?;
        Ok(path)
    }
}

#[async_trait::async_trait]
impl PageChecker for HttpChecker {
    async fn check(
        &self,
        url: &str,
        depth: u32,
        flags: CheckFlags,
    ) -> Result<CheckReport, CheckError> {
        let root = Url::parse(url).map_err(|e| CheckError::Parse(e.to_string()))?;
        let host = root
            .host_str()
            .ok_or_else(|| CheckError::Parse(format!("URL has no host: {}", url)))?
            .to_string();

        let mut report = CheckReport {
            final_url: root.to_string(),
            title: None,
            pages_checked: 0,
            pages_failed: 0,
            links_found: 0,
        };

        let mut seen = HashSet::new();
        seen.insert(dedupe_key(&root, flags.follow_pagination));

        let mut frontier = VecDeque::new();
        frontier.push_back((root, 0u32));

        while let Some((page_url, page_depth)) = frontier.pop_front() {
            if report.pages_checked >= self.page_cap {
                tracing::debug!(host = %host, cap = self.page_cap, "page cap reached");
                break;
            }

            let is_root = report.pages_checked == 0;

            match self.fetch_page(&page_url).await {
                Err(e) if is_root => return Err(e),
                Err(e) => {
                    tracing::debug!(url = %page_url, error = %e, "page fetch failed");
                    report.pages_checked += 1;
                    report.pages_failed += 1;
                }

                Ok(FetchedPage::HttpError { status }) if is_root => {
                    return Err(CheckError::Network(format!("HTTP {}", status)));
                }
                Ok(FetchedPage::HttpError { status }) => {
                    tracing::debug!(url = %page_url, status, "page returned error status");
                    report.pages_checked += 1;
                    report.pages_failed += 1;
                }

                Ok(FetchedPage::NonHtml) => {
                    report.pages_checked += 1;
                }

                Ok(FetchedPage::Html { final_url, body }) => {
                    report.pages_checked += 1;
                    if is_root {
                        report.final_url = final_url;
                    }

                    if flags.save_artifacts {
                        if let Err(e) = self.save_artifact(&page_url, &body) {
                            tracing::warn!(url = %page_url, error = %e, "failed to save artifact");
                        }
                    }

                    let (title, links) = parse_page(&body, &page_url);
                    if is_root {
                        report.title = title;
                    }

                    for link in links {
                        if link.host_str() != Some(host.as_str()) {
                            continue;
                        }
                        report.links_found += 1;

                        if page_depth >= depth {
                            continue;
                        }
                        if seen.insert(dedupe_key(&link, flags.follow_pagination)) {
                            frontier.push_back((link, page_depth + 1));
                        }
                    }
                }
            }
        }

        Ok(report)
    }
}

/// Parses an HTML page and extracts the title plus absolute link URLs
///
/// Non-navigational schemes (`javascript:`, `mailto:`, `tel:`, data URIs)
/// and pure fragment links are skipped; fragments are stripped from the
/// returned URLs.
fn parse_page(html: &str, base_url: &Url) -> (Option<String>, Vec<Url>) {
    let document = Html::parse_document(html);

    let title_selector = Selector::parse("title").unwrap();
    let title = document
        .select(&title_selector)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let link_selector = Selector::parse("a[href]").unwrap();
    let mut links = Vec::new();

    for element in document.select(&link_selector) {
        let href = match element.value().attr("href") {
            Some(h) => h.trim(),
            None => continue,
        };

        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
            || href.starts_with("data:")
        {
            continue;
        }

        match base_url.join(href) {
            Ok(mut resolved) => {
                resolved.set_fragment(None);
                links.push(resolved);
            }
            Err(e) => {
                tracing::trace!(href = %href, error = %e, "skipping unresolvable link");
            }
        }
    }

    (title, links)
}

/// Computes the deduplication key for a URL
///
/// When pagination following is disabled, pagination query parameters are
/// stripped so that page variants collapse to a single key.
fn dedupe_key(url: &Url, follow_pagination: bool) -> String {
    if follow_pagination {
        return url.as_str().to_string();
    }

    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !PAGINATION_PARAMS.contains(&k.to_ascii_lowercase().as_str()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut stripped = url.clone();
    if retained.is_empty() {
        stripped.set_query(None);
    } else {
        stripped.query_pairs_mut().clear().extend_pairs(retained);
    }
    stripped.as_str().to_string()
}

/// Maps a hostname to a filesystem-safe directory name
fn sanitize_host(host: &str) -> String {
    host.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
