//! Retry budgets and backoff delays

use crate::config::{BackoffKind, FetchConfig};
use std::time::Duration;

/// Retry limits and delays applied by the fetch client
///
/// Server and network failures share one bounded budget (`max_retries`) and
/// back off between attempts. Rate-limit waits follow the delay the server
/// declares and are unbounded unless one of the `max_rate_limit_*` ceilings is
/// set.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrySettings {
    /// Retries after the first attempt on server or network errors
    pub max_retries: u32,

    /// Delay before the first retry
    pub base_delay: Duration,

    /// Upper bound for any single retry delay
    pub max_delay: Duration,

    /// How the delay grows between retries
    pub backoff: BackoffKind,

    /// Wait used when a 429 cannot be interpreted (None = fail the page)
    pub fallback_rate_limit_wait: Option<Duration>,

    /// Maximum number of rate-limit waits per fetch
    pub max_rate_limit_retries: Option<u32>,

    /// Maximum cumulative rate-limit wait per fetch
    pub max_rate_limit_wait: Option<Duration>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for RetrySettings {
    fn from(config: &FetchConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_backoff_ms),
            max_delay: Duration::from_millis(config.max_backoff_ms),
            backoff: config.backoff,
            fallback_rate_limit_wait: config
                .fallback_rate_limit_wait_secs
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok()),
            max_rate_limit_retries: config.max_rate_limit_retries,
            max_rate_limit_wait: config
                .max_rate_limit_wait_secs
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok()),
        }
    }
}

impl RetrySettings {
    /// Delay before the given retry (1 = first retry)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let delay = match self.backoff {
            BackoffKind::Fixed => self.base_delay,
            BackoffKind::Exponential => {
                let exponent = retry.saturating_sub(1).min(31);
                self.base_delay.saturating_mul(1u32 << exponent)
            }
        };
        delay.min(self.max_delay)
    }

    /// Whether another rate-limit wait of `next` fits in the ceilings
    pub fn allows_rate_limit_wait(&self, waits_so_far: u32, waited: Duration, next: Duration) -> bool {
        if let Some(max) = self.max_rate_limit_retries {
            if waits_so_far >= max {
                return false;
            }
        }
        if let Some(max) = self.max_rate_limit_wait {
            if waited.saturating_add(next) > max {
                return false;
            }
        }
        true
    }
}
