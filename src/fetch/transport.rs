//! The HTTP round-trip seam
//!
//! The fetch client never talks to `reqwest` directly. It goes through the
//! [`Transport`] trait so the retry loop can be driven by scripted responses
//! in tests and by a pooled `reqwest::Client` in production.

use crate::config::{FetchConfig, UserAgentConfig};
use crate::fetch::request::{content_type_of, Request};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Network-level failure of a single round trip
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            Self::Body(e.to_string())
        } else {
            Self::Other(e.to_string())
        }
    }
}

/// Status, headers and body of one HTTP round trip
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn content_type(&self) -> Option<String> {
        content_type_of(&self.headers)
    }
}

/// Performs one HTTP round trip
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &Request) -> Result<RawResponse, TransportError>;
}

/// Transport backed by a shared, connection-pooling `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds the HTTP client from configuration and wraps it
    pub fn from_config(
        user_agent: &UserAgentConfig,
        fetch: &FetchConfig,
    ) -> Result<Self, reqwest::Error> {
        build_http_client(user_agent, fetch).map(Self::new)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &Request) -> Result<RawResponse, TransportError> {
        let response = self
            .client
            .get(request.url())
            .headers(request.headers().clone())
            .send()
            .await?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// Builds an HTTP client with proper configuration
///
/// The per-request timeout covers a whole round trip (connect, send, read) and
/// is independent of any rate-limit wait, which happens between round trips.
///
/// # Example
///
/// ```no_run
/// use sumi_harvest::config::{FetchConfig, UserAgentConfig};
/// use sumi_harvest::fetch::build_http_client;
///
/// let user_agent = UserAgentConfig {
///     crawler_name: "SumiHarvest".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: Some("https://example.com/about".to_string()),
///     contact_email: None,
///     override_value: None,
/// };
///
/// let client = build_http_client(&user_agent, &FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    fetch: &FetchConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(fetch.request_timeout_secs))
        .connect_timeout(Duration::from_secs(fetch.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}
