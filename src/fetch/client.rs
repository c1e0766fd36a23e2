//! The retrying fetch client

use crate::fetch::backoff::RetrySettings;
use crate::fetch::policy::{PolicyError, RateLimitPolicy, ResponseOutcome};
use crate::fetch::request::{Payload, Request};
use crate::fetch::transport::{ReqwestTransport, Transport};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Terminal failure of a logical fetch
///
/// Retrying the same request is known not to help, or the retry budget is
/// spent. The crawler treats every variant as a failure of one page only.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{url} returned HTTP {status}; not retrying")]
    Client { url: String, status: u16 },

    #[error("{url} failed after {attempts} attempts, last failure: {last_failure}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_failure: String,
    },

    #[error("rate-limit response from {url} could not be interpreted: {source}")]
    RateLimitPolicy {
        url: String,
        #[source]
        source: PolicyError,
    },

    #[error("rate-limit budget exhausted for {url} after {waits} waits ({waited:?} total)")]
    RateLimitBudgetExhausted {
        url: String,
        waits: u32,
        waited: Duration,
    },

    #[error("invalid request for {url}: {reason}")]
    InvalidRequest { url: String, reason: String },

    #[error("fetch of {url} was cancelled")]
    Cancelled { url: String },
}

impl FetchError {
    /// The URL the failed fetch was for
    pub fn url(&self) -> &str {
        match self {
            Self::Client { url, .. }
            | Self::RetriesExhausted { url, .. }
            | Self::RateLimitPolicy { url, .. }
            | Self::RateLimitBudgetExhausted { url, .. }
            | Self::InvalidRequest { url, .. }
            | Self::Cancelled { url } => url,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Performs logical fetches, retrying through rate limits and transient failures
///
/// The client holds no per-fetch state: every call to [`fetch`] runs its own
/// retry loop, so one client can serve many pages concurrently. Waiting is
/// done with `tokio::time::sleep`, which suspends only the calling task.
///
/// [`fetch`]: FetchClient::fetch
pub struct FetchClient<T = ReqwestTransport> {
    transport: T,
    policy: RateLimitPolicy,
    retry: RetrySettings,
}

impl<T: Transport> FetchClient<T> {
    pub fn new(transport: T, policy: RateLimitPolicy, retry: RetrySettings) -> Self {
        Self {
            transport,
            policy,
            retry,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetches a request until it succeeds or fails terminally
    ///
    /// # Retry Logic
    ///
    /// | Outcome | Action |
    /// |---------|--------|
    /// | Success | Return the payload |
    /// | RateLimited | Sleep for the declared delay, retry (ceilings optional) |
    /// | Unreadable rate limit | Fallback wait if configured, otherwise fail |
    /// | ServerError / TransportError | Back off and retry up to `max_retries` times |
    /// | ClientError | Fail without retrying |
    ///
    /// Cancelling `cancel` interrupts both in-flight requests and waits.
    pub async fn fetch(
        &self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<Payload, FetchError> {
        let url = request.url();
        let mut attempts = 0u32;
        let mut failures = 0u32;
        let mut rate_limit_waits = 0u32;
        let mut rate_limit_waited = Duration::ZERO;

        loop {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled {
                    url: url.to_string(),
                });
            }

            attempts += 1;
            tracing::debug!("Fetching {} (attempt {})", url, attempts);

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(FetchError::Cancelled { url: url.to_string() });
                }
                result = self.transport.execute(request) => result,
            };

            let content_type = result.as_ref().ok().and_then(|raw| raw.content_type());

            let outcome = match self.policy.evaluate(result) {
                Ok(outcome) => outcome,
                Err(source) => match self.retry.fallback_rate_limit_wait {
                    Some(wait) => {
                        tracing::warn!(
                            "{} from {}; using fallback wait of {:.2}s",
                            source,
                            url,
                            wait.as_secs_f64()
                        );
                        ResponseOutcome::RateLimited { retry_after: wait }
                    }
                    None => {
                        return Err(FetchError::RateLimitPolicy {
                            url: url.to_string(),
                            source,
                        })
                    }
                },
            };

            match outcome {
                ResponseOutcome::Success { status, body } => {
                    tracing::debug!(
                        "Fetched {} ({} bytes, {} attempts)",
                        url,
                        body.len(),
                        attempts
                    );
                    return Ok(Payload {
                        status,
                        content_type,
                        body,
                        attempts,
                    });
                }

                ResponseOutcome::RateLimited { retry_after } => {
                    if !self.retry.allows_rate_limit_wait(
                        rate_limit_waits,
                        rate_limit_waited,
                        retry_after,
                    ) {
                        return Err(FetchError::RateLimitBudgetExhausted {
                            url: url.to_string(),
                            waits: rate_limit_waits,
                            waited: rate_limit_waited,
                        });
                    }

                    tracing::info!(
                        "Rate limit hit on {}. Sleeping for {:.2} seconds...",
                        url,
                        retry_after.as_secs_f64()
                    );
                    self.pause(retry_after, url, cancel).await?;
                    rate_limit_waits += 1;
                    rate_limit_waited += retry_after;
                }

                ResponseOutcome::ServerError { status } => {
                    failures += 1;
                    self.back_off(failures, attempts, &format!("HTTP {}", status), url, cancel)
                        .await?;
                }

                ResponseOutcome::TransportError { cause } => {
                    failures += 1;
                    self.back_off(failures, attempts, &cause.to_string(), url, cancel)
                        .await?;
                }

                ResponseOutcome::ClientError { status } => {
                    return Err(FetchError::Client {
                        url: url.to_string(),
                        status,
                    });
                }
            }
        }
    }

    /// Waits before the next retry, or fails once the retry budget is spent
    async fn back_off(
        &self,
        failures: u32,
        attempts: u32,
        failure: &str,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<(), FetchError> {
        if failures > self.retry.max_retries {
            return Err(FetchError::RetriesExhausted {
                url: url.to_string(),
                attempts,
                last_failure: failure.to_string(),
            });
        }

        let delay = self.retry.delay_for(failures);
        tracing::warn!(
            "{} on {}; retry {}/{} in {:?}",
            failure,
            url,
            failures,
            self.retry.max_retries,
            delay
        );
        self.pause(delay, url, cancel).await
    }

    async fn pause(
        &self,
        delay: Duration,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<(), FetchError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled { url: url.to_string() }),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}
