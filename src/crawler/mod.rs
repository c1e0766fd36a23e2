//! Crawler module for paginated catalog harvesting
//!
//! This module contains the traversal logic, including:
//! - Page cursors and the URL templates that turn them into URLs
//! - Credentials attached to every request
//! - The pagination driver (sequential or bounded-concurrent)
//! - Wiring a complete run from configuration

mod auth;
mod cursor;
mod driver;
mod summary;
mod template;

pub use auth::{AuthSupplier, StaticCredential};
pub use cursor::PageCursor;
pub use driver::{DetailStage, PaginationDriver};
pub use summary::CrawlSummary;
pub use template::{PatternTemplate, RecordTemplate, UrlTemplate};

use crate::config::Config;
use crate::extract::build_extractor;
use crate::fetch::{FetchClient, RateLimitPolicy, ReqwestTransport, RetrySettings};
use crate::output::open_sink;
use crate::url::DomainAllowList;
use crate::HarvestError;
use reqwest::header::HeaderName;
use tokio_util::sync::CancellationToken;

/// The first cursor of a configured run
pub fn start_cursor(config: &Config) -> PageCursor {
    match &config.crawler.start_token {
        Some(token) => PageCursor::Token(token.clone()),
        None => PageCursor::Page(config.crawler.start_page),
    }
}

/// URLs of the first `limit` pages a run would visit
///
/// Token chains are only known while crawling, so for a token start this
/// yields the first URL alone.
pub fn planned_urls(config: &Config, limit: usize) -> Vec<String> {
    let template = PatternTemplate::new(&config.target.url_template);
    let count = limit.min(config.crawler.max_pages as usize);

    match start_cursor(config) {
        PageCursor::Page(first) => (0..count as u32)
            .filter_map(|offset| first.checked_add(offset))
            .map(|page| template.url_for(&PageCursor::Page(page)))
            .collect(),
        token => std::iter::once(template.url_for(&token))
            .take(count)
            .collect(),
    }
}

/// Builds the pagination driver described by the configuration
///
/// Reads the credential environment variable when the target needs one and
/// compiles the detail extractor when a detail stage is configured.
///
/// # Returns
///
/// * `Ok(PaginationDriver)` - Ready to run
/// * `Err(HarvestError)` - The HTTP client, a header name, the credential or
///   the detail extractor could not be set up
pub fn build_driver(config: &Config) -> Result<PaginationDriver, HarvestError> {
    let transport = ReqwestTransport::from_config(&config.user_agent, &config.fetch)?;
    let policy = RateLimitPolicy::from_names(&config.fetch.rate_limit_headers)
        .map_err(|e| HarvestError::InvalidHeader(e.to_string()))?;
    let client = FetchClient::new(transport, policy, RetrySettings::from(&config.fetch));

    let mut driver = PaginationDriver::new(client, PatternTemplate::new(&config.target.url_template))
        .with_allow_list(DomainAllowList::new(config.target.allowed_domains.iter().cloned()))
        .with_concurrency(config.crawler.concurrency as usize)
        .with_stop_after_empty_pages(config.crawler.stop_after_empty_pages);

    if let Some(detail) = &config.detail {
        let extractor = build_extractor(&detail.extractor)?;
        driver = driver.with_detail(
            DetailStage::new(RecordTemplate::new(&detail.url_template), extractor)
                .with_parent_attribute(detail.parent_attribute.clone()),
        );
    }

    if let Some(auth) = &config.target.auth {
        let secret = std::env::var(&auth.env)
            .map_err(|_| HarvestError::MissingCredential(auth.env.clone()))?;
        let header = HeaderName::from_bytes(auth.header.as_bytes())
            .map_err(|e| HarvestError::InvalidHeader(format!("{}: {}", auth.header, e)))?;
        driver = driver.with_auth(
            header,
            StaticCredential::with_prefix(secret.trim(), auth.prefix.as_deref()),
        );
    }

    Ok(driver)
}

/// Runs a complete harvest
///
/// This is the main entry point for a configured run. It will:
/// 1. Build the HTTP client, fetch policy and pagination driver
/// 2. Compile the extractor
/// 3. Open the output sink
/// 4. Walk the configured page range
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `config_hash` - Hash of the configuration file, stored with the output
/// * `cancel` - Cancelling it stops the run at the next wait or page boundary
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - The run finished, possibly with failed pages
/// * `Err(HarvestError)` - The run could not be set up
pub async fn harvest(
    config: &Config,
    config_hash: &str,
    cancel: CancellationToken,
) -> Result<CrawlSummary, HarvestError> {
    let driver = build_driver(config)?;
    let extractor = build_extractor(&config.extractor)?;
    let sink = open_sink(&config.output, config_hash)?;

    tracing::info!(
        "Harvesting {} with config {}",
        config.target.url_template,
        config_hash
    );

    Ok(driver
        .run(
            start_cursor(config),
            config.crawler.max_pages,
            extractor,
            sink,
            cancel,
        )
        .await)
}
