//! Request and payload types shared by the fetch layer

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};

/// A single read-only fetch
///
/// A request is built once per page and then reused unmodified by every
/// attempt of the retry loop, so it exposes no way to change it after
/// construction other than the consuming builder methods.
#[derive(Debug, Clone)]
pub struct Request {
    url: String,
    headers: HeaderMap,
}

impl Request {
    /// Creates a GET request for the given URL
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HeaderMap::new(),
        }
    }

    /// Adds a header, replacing any previous value for the same name
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// The HTTP method, always GET
    pub fn method(&self) -> &'static str {
        "GET"
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// The body of a successful fetch
#[derive(Debug, Clone)]
pub struct Payload {
    /// HTTP status code of the final attempt
    pub status: u16,

    /// Content-Type header value, if the server sent one
    pub content_type: Option<String>,

    /// Raw response body
    pub body: Vec<u8>,

    /// Number of HTTP round trips it took to obtain this payload
    pub attempts: u32,
}

impl Payload {
    /// Returns the body as UTF-8 text, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Reads the Content-Type header as a string
pub(crate) fn content_type_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
