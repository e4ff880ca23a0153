use crate::config::types::{CheckerConfig, Config, OutputConfig, PoolConfig, SiteEntry};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_pool_config(&config.pool)?;
    validate_checker_config(&config.checker)?;
    validate_output_config(&config.output)?;
    validate_sites(&config.sites)?;
    Ok(())
}

/// Validates worker pool configuration
fn validate_pool_config(config: &PoolConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 64 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 64, got {}",
            config.concurrency
        )));
    }

    // max_memory_mb = 0 is allowed: it is the recycle-after-every-task policy

    if config.task_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "task-timeout-secs must be >= 1, got {}",
            config.task_timeout_secs
        )));
    }

    if config.grace_period_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "grace-period-secs must be >= 1, got {}",
            config.grace_period_secs
        )));
    }

    Ok(())
}

/// Validates page checker configuration
fn validate_checker_config(config: &CheckerConfig) -> Result<(), ConfigError> {
    if config.depth > 10 {
        return Err(ConfigError::Validation(format!(
            "depth must be <= 10, got {}",
            config.depth
        )));
    }

    if config.page_cap < 1 {
        return Err(ConfigError::Validation(format!(
            "page-cap must be >= 1, got {}",
            config.page_cap
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if config.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.report_path.is_empty() {
        return Err(ConfigError::Validation(
            "report-path cannot be empty".to_string(),
        ));
    }

    if config.artifacts_dir.is_empty() {
        return Err(ConfigError::Validation(
            "artifacts-dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the site list
fn validate_sites(sites: &[SiteEntry]) -> Result<(), ConfigError> {
    if sites.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[site]] entry is required".to_string(),
        ));
    }

    for entry in sites {
        if entry.name.is_empty() {
            return Err(ConfigError::Validation(format!(
                "site with URL '{}' has an empty name",
                entry.url
            )));
        }

        let url = Url::parse(&entry.url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid URL '{}': {}", entry.url, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Site URL '{}' must use http or https scheme",
                entry.url
            )));
        }

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "Site URL '{}' has no host",
                entry.url
            )));
        }
    }

    Ok(())
}
