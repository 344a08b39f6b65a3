//! IA ISO Spider: a yield-guided disk-image discoverer
//!
//! This crate crawls the Internet Archive collection/item graph from a handful
//! of seed identifiers, following parent-collection references outward and
//! recording every `.iso`/`.img` style file it finds. Collections that have
//! produced files are visited before speculative ones.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;

use thiserror::Error;

/// Main error type for spider operations
#[derive(Debug, Error)]
pub enum SpiderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Network failure, timeout or retryable status that outlived the retry budget
    #[error("Transient failure for {url} after {attempts} attempt(s): {message}")]
    Transient {
        url: String,
        attempts: u32,
        message: String,
    },

    /// Non-retryable HTTP status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// The remote service answered with something we could not interpret
    #[error("Unexpected response from {url}: {message}")]
    Protocol { url: String, message: String },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SpiderError {
    /// Returns true for failures that a later attempt might not reproduce
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
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

/// Result type alias for spider operations
pub type Result<T> = std::result::Result<T, SpiderError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, Coordinator, CrawlOutcome, CrawlReport};
pub use output::DiscoveredFile;
pub use state::{CrawlState, CrawlStatus, Frontier, FrontierNode, NodeKind, VisitedSets, YieldStats};
