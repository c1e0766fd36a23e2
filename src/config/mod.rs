//! Configuration module for Sumi-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("configs/nyaa.toml")).unwrap();
//! println!("Harvesting up to {} pages", config.crawler.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AuthConfig, BackoffKind, Config, CrawlerConfig, DetailConfig, ExtractorConfig, FetchConfig,
    FilterConfig, HtmlExtractorConfig, JsonExtractorConfig, OutputConfig, OutputFormat, TargetConfig,
    UserAgentConfig, WriteMode,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
