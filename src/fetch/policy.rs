//! Response classification and rate-limit interpretation
//!
//! | Condition | Outcome | Fetch client action |
//! |-----------|---------|---------------------|
//! | HTTP 200 | `Success` | Return the payload |
//! | HTTP 429 + reset header | `RateLimited` | Sleep exactly the declared delay, retry |
//! | HTTP 429, header missing/garbled | `PolicyError` | Fallback wait if configured, else fail the page |
//! | HTTP 5xx | `ServerError` | Retry with backoff, bounded |
//! | Connection/timeout/body failure | `TransportError` | Retry with backoff, bounded |
//! | Any other status | `ClientError` | Fail immediately |

use crate::fetch::transport::{RawResponse, TransportError};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, InvalidHeaderName};
use std::time::Duration;
use thiserror::Error;

/// Header the catalog APIs we target use to announce the reset delay
pub const RATE_LIMIT_RESET_AFTER: &str = "x-ratelimit-reset-after";

/// Failure to interpret a rate-limit response
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("rate limited without a reset header (looked for: {expected})")]
    MissingHeader { expected: String },

    #[error("unparsable rate-limit header {header}: '{value}'")]
    Unparsable { header: String, value: String },
}

/// Classification of a single fetch attempt
///
/// Exactly one variant holds per attempt.
#[derive(Debug)]
pub enum ResponseOutcome {
    Success { status: u16, body: Vec<u8> },
    RateLimited { retry_after: Duration },
    ServerError { status: u16 },
    ClientError { status: u16 },
    TransportError { cause: TransportError },
}

/// Interprets response statuses and rate-limit headers
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    reset_headers: Vec<HeaderName>,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            reset_headers: vec![
                HeaderName::from_static(RATE_LIMIT_RESET_AFTER),
                reqwest::header::RETRY_AFTER,
            ],
        }
    }
}

impl RateLimitPolicy {
    /// Creates a policy reading the reset delay from the given headers, in order
    pub fn new(reset_headers: Vec<HeaderName>) -> Self {
        Self { reset_headers }
    }

    /// Creates a policy from header names given as strings
    pub fn from_names<I, S>(names: I) -> Result<Self, InvalidHeaderName>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let reset_headers = names
            .into_iter()
            .map(|name| HeaderName::from_bytes(name.as_ref().as_bytes()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { reset_headers })
    }

    /// Classifies a status code and its headers
    ///
    /// A `Success` produced here carries an empty body; use [`evaluate`] to
    /// classify a full round trip.
    ///
    /// [`evaluate`]: RateLimitPolicy::evaluate
    pub fn classify(&self, status: u16, headers: &HeaderMap) -> Result<ResponseOutcome, PolicyError> {
        let outcome = match status {
            200 => ResponseOutcome::Success {
                status,
                body: Vec::new(),
            },
            429 => ResponseOutcome::RateLimited {
                retry_after: self.retry_after(headers)?,
            },
            500..=599 => ResponseOutcome::ServerError { status },
            _ => ResponseOutcome::ClientError { status },
        };
        Ok(outcome)
    }

    /// Classifies the result of one round trip, moving the body into `Success`
    pub fn evaluate(
        &self,
        attempt: Result<RawResponse, TransportError>,
    ) -> Result<ResponseOutcome, PolicyError> {
        let raw = match attempt {
            Ok(raw) => raw,
            Err(cause) => return Ok(ResponseOutcome::TransportError { cause }),
        };

        match self.classify(raw.status, &raw.headers)? {
            ResponseOutcome::Success { status, .. } => Ok(ResponseOutcome::Success {
                status,
                body: raw.body,
            }),
            other => Ok(other),
        }
    }

    /// Reads the reset delay from the first configured header present
    fn retry_after(&self, headers: &HeaderMap) -> Result<Duration, PolicyError> {
        let (name, value) = self
            .reset_headers
            .iter()
            .find_map(|name| headers.get(name).map(|value| (name, value)))
            .ok_or_else(|| PolicyError::MissingHeader {
                expected: self
                    .reset_headers
                    .iter()
                    .map(HeaderName::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;

        let unparsable = || PolicyError::Unparsable {
            header: name.to_string(),
            value: String::from_utf8_lossy(value.as_bytes()).into_owned(),
        };

        let text = value.to_str().map_err(|_| unparsable())?;
        parse_reset_after(text, Utc::now()).ok_or_else(unparsable)
    }
}

/// Parses a reset delay
///
/// Accepts fractional seconds (`"1.25"`) or, as `Retry-After` allows, an HTTP
/// date; a date in the past yields a zero delay. Negative, NaN and infinite
/// values are rejected.
pub fn parse_reset_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();

    if let Ok(seconds) = value.parse::<f64>() {
        if !seconds.is_finite() || seconds < 0.0 {
            return None;
        }
        return Duration::try_from_secs_f64(seconds).ok();
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}
