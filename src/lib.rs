//! Sitepulse: a resource-aware website health checker
//!
//! This crate checks the availability of a large set of websites by fetching
//! pages concurrently under a fixed worker budget, recycling workers that
//! exceed a memory ceiling, and producing a consolidated session report.

pub mod checker;
pub mod config;
pub mod pool;
pub mod report;

use thiserror::Error;

/// Main error type for sitepulse operations
#[derive(Debug, Error)]
pub enum PulseError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Memory probe error: {0}")]
    Memory(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for sitepulse operations
pub type Result<T> = std::result::Result<T, PulseError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use checker::{CheckError, CheckFlags, CheckReport, PageChecker};
pub use config::Config;
pub use pool::{run_session, FailureKind, SessionReport, SessionState, TaskStatus};
