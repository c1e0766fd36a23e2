//! Scripted transport for driving the fetch and crawl layers in tests

use crate::fetch::policy::RATE_LIMIT_RESET_AFTER;
use crate::fetch::request::Request;
use crate::fetch::transport::{RawResponse, Transport, TransportError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Replays queued responses per URL; unscripted URLs answer 404
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Result<RawResponse, TransportError>>>>,
    calls: Mutex<Vec<String>>,
    latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every round trip takes `latency` of (paused) tokio time
    pub(crate) fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub(crate) fn push(&self, url: &str, response: Result<RawResponse, TransportError>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: &Request) -> Result<RawResponse, TransportError> {
        self.calls.lock().unwrap().push(request.url().to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.scripts
            .lock()
            .unwrap()
            .get_mut(request.url())
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| status(404))
    }
}

pub(crate) fn ok(body: &str) -> Result<RawResponse, TransportError> {
    Ok(RawResponse {
        status: 200,
        headers: HeaderMap::new(),
        body: body.as_bytes().to_vec(),
    })
}

pub(crate) fn status(code: u16) -> Result<RawResponse, TransportError> {
    Ok(RawResponse {
        status: code,
        headers: HeaderMap::new(),
        body: Vec::new(),
    })
}

pub(crate) fn rate_limited(reset_after: &str) -> Result<RawResponse, TransportError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        RATE_LIMIT_RESET_AFTER,
        HeaderValue::from_str(reset_after).unwrap(),
    );
    Ok(RawResponse {
        status: 429,
        headers,
        body: Vec::new(),
    })
}
