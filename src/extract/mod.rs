//! Record extraction from fetched pages
//!
//! An extractor turns one page body into zero or more [`Record`]s. It is
//! pure: the same bytes always yield the same records, and it never touches
//! the network or the sink.

mod filter;
mod html;
mod json;

pub use filter::RecordFilter;
pub use html::HtmlExtractor;
pub use json::JsonExtractor;

use crate::config::ExtractorConfig;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while building an extractor or reading a page
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("invalid CSS selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("invalid filter pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("unexpected document shape: {0}")]
    Shape(String),

    #[error("{extractor} extractor cannot read {kind} content")]
    UnsupportedContent {
        extractor: &'static str,
        kind: ContentKind,
    },
}

/// Kind of document a catalog serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Json,
}

impl ContentKind {
    /// Value sent in the `Accept` header of every page request
    pub fn accept_header(&self) -> &'static str {
        match self {
            Self::Html => "text/html,application/xhtml+xml",
            Self::Json => "application/json",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Html => write!(f, "HTML"),
            Self::Json => write!(f, "JSON"),
        }
    }
}

/// One extracted catalog entry
///
/// `text` is what a line sink writes (a torrent title, a file name).
/// `attributes` carry any structured fields the extractor picked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub text: String,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl Record {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// True if the text is empty or whitespace only
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Everything an extractor reads from one page body
#[derive(Debug)]
pub struct ExtractedPage {
    pub records: Result<Vec<Record>, ExtractionError>,
    pub next_cursor: Option<String>,
}

/// Turns a page body into records
pub trait PageExtractor: Send + Sync {
    /// The content kind this extractor expects, used for the `Accept` header
    fn content_kind(&self) -> ContentKind;

    /// Extracts every record on the page, in document order
    fn extract(&self, body: &[u8], kind: ContentKind) -> Result<Vec<Record>, ExtractionError>;

    /// Continuation token for the page after this one, if any
    fn next_cursor(&self, _body: &[u8], _kind: ContentKind) -> Option<String> {
        None
    }

    /// Records and continuation token together
    ///
    /// Extractors that parse the body into a document should override this to
    /// parse it only once. The token is independent of the records: a page
    /// whose records cannot be read may still point at the next page.
    fn extract_page(&self, body: &[u8], kind: ContentKind) -> ExtractedPage {
        ExtractedPage {
            records: self.extract(body, kind),
            next_cursor: self.next_cursor(body, kind),
        }
    }
}

/// Builds the extractor described by the configuration
///
/// # Arguments
///
/// * `config` - The `[extractor]` section
///
/// # Returns
///
/// * `Ok(Arc<dyn PageExtractor>)` - Ready to be shared by concurrent pages
/// * `Err(ExtractionError)` - A selector or filter could not be compiled
pub fn build_extractor(config: &ExtractorConfig) -> Result<Arc<dyn PageExtractor>, ExtractionError> {
    match config {
        ExtractorConfig::Html(html) => {
            let filter = RecordFilter::from_config(&html.filter)?;
            let extractor =
                HtmlExtractor::new(&html.row_selector, html.field_selector.as_deref(), filter)?;
            Ok(Arc::new(extractor))
        }
        ExtractorConfig::Json(json) => {
            let filter = RecordFilter::from_config(&json.filter)?;
            let extractor = JsonExtractor::new(&json.text_field)
                .with_items_path(&json.items_path)
                .with_attribute_fields(json.attribute_fields.iter().cloned())
                .with_next_cursor_field(json.next_cursor_field.as_deref())
                .with_filter(filter);
            Ok(Arc::new(extractor))
        }
    }
}
