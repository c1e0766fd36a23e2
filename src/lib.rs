//! Sumi-Harvest: a polite paginated catalog harvester
//!
//! This crate walks the pages of a remote catalog (an HTML listing or a JSON API),
//! extracts records from every page and hands them to a sink, while honoring the
//! remote's rate limits and riding out transient failures.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod fetch;
pub mod output;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Harvest setup and wiring
///
/// Per-page failures never surface here; the crawler counts them in its
/// summary instead.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Extractor setup error: {0}")]
    Extraction(#[from] extract::ExtractionError),

    #[error("Sink error: {0}")]
    Sink(#[from] output::SinkError),

    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(String),
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

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// Result type alias for Sumi-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlSummary, PageCursor, PaginationDriver};
pub use extract::{ContentKind, PageExtractor, Record};
pub use fetch::{FetchClient, FetchError, Request};
pub use output::Sink;
