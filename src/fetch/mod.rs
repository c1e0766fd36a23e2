//! Fetching with rate-limit compliance and bounded retries
//!
//! A logical fetch is made of one or more HTTP round trips:
//!
//! 1. [`Transport`] performs a single round trip
//! 2. [`RateLimitPolicy`] classifies the result into a [`ResponseOutcome`]
//! 3. [`FetchClient`] decides whether to return, wait and retry, or give up
//!
//! Rate-limit waits sleep exactly as long as the server asks and never count
//! against the retry budget for server and network errors.

mod backoff;
mod client;
mod policy;
mod request;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use backoff::RetrySettings;
pub use client::{FetchClient, FetchError};
pub use policy::{
    parse_reset_after, PolicyError, RateLimitPolicy, ResponseOutcome, RATE_LIMIT_RESET_AFTER,
};
pub use request::{Payload, Request};
pub use transport::{
    build_http_client, RawResponse, ReqwestTransport, Transport, TransportError,
};
