//! Record extraction from JSON API responses

use crate::extract::{
    ContentKind, ExtractedPage, ExtractionError, PageExtractor, Record, RecordFilter,
};
use serde_json::Value;

/// Extracts one record per item of a JSON array
///
/// The array is found by following a dotted path from the document root
/// (`"data.entries"`; numeric segments index arrays). Items whose text field
/// is missing or null are skipped.
#[derive(Debug, Clone)]
pub struct JsonExtractor {
    items_path: Vec<String>,
    text_field: String,
    attribute_fields: Vec<String>,
    next_cursor_field: Option<Vec<String>>,
    filter: RecordFilter,
}

impl JsonExtractor {
    /// Creates an extractor reading `text_field` from items of the root array
    pub fn new(text_field: impl Into<String>) -> Self {
        Self {
            items_path: Vec::new(),
            text_field: text_field.into(),
            attribute_fields: Vec::new(),
            next_cursor_field: None,
            filter: RecordFilter::passthrough(),
        }
    }

    pub fn with_items_path(mut self, path: &str) -> Self {
        self.items_path = split_path(path);
        self
    }

    pub fn with_attribute_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attribute_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_next_cursor_field(mut self, path: Option<&str>) -> Self {
        self.next_cursor_field = path.map(split_path).filter(|p| !p.is_empty());
        self
    }

    pub fn with_filter(mut self, filter: RecordFilter) -> Self {
        self.filter = filter;
        self
    }

    fn parse(&self, body: &[u8], kind: ContentKind) -> Result<Value, ExtractionError> {
        if kind != ContentKind::Json {
            return Err(ExtractionError::UnsupportedContent {
                extractor: "JSON",
                kind,
            });
        }
        Ok(serde_json::from_slice(body)?)
    }

    fn read_item(&self, item: &Value) -> Option<Record> {
        let text = item.get(&self.text_field).and_then(scalar_text)?;
        let cleaned = self.filter.apply(&text)?;

        let mut record = Record::new(cleaned);
        for field in &self.attribute_fields {
            if let Some(value) = item.get(field).and_then(scalar_text) {
                record = record.with_attribute(field.as_str(), value);
            }
        }
        Some(record)
    }
}

impl JsonExtractor {
    fn records_in(&self, document: &Value) -> Result<Vec<Record>, ExtractionError> {
        let items = lookup(document, &self.items_path)
            .ok_or_else(|| {
                ExtractionError::Shape(format!("no value at '{}'", self.items_path.join(".")))
            })?
            .as_array()
            .ok_or_else(|| {
                ExtractionError::Shape(format!(
                    "value at '{}' is not an array",
                    self.items_path.join(".")
                ))
            })?;

        Ok(items.iter().filter_map(|item| self.read_item(item)).collect())
    }

    fn cursor_in(&self, document: &Value) -> Option<String> {
        let path = self.next_cursor_field.as_ref()?;
        lookup(document, path)
            .and_then(scalar_text)
            .filter(|token| !token.is_empty())
    }
}

impl PageExtractor for JsonExtractor {
    fn content_kind(&self) -> ContentKind {
        ContentKind::Json
    }

    fn extract(&self, body: &[u8], kind: ContentKind) -> Result<Vec<Record>, ExtractionError> {
        self.records_in(&self.parse(body, kind)?)
    }

    fn next_cursor(&self, body: &[u8], kind: ContentKind) -> Option<String> {
        self.next_cursor_field.as_ref()?;
        self.cursor_in(&self.parse(body, kind).ok()?)
    }

    fn extract_page(&self, body: &[u8], kind: ContentKind) -> ExtractedPage {
        match self.parse(body, kind) {
            Ok(document) => ExtractedPage {
                records: self.records_in(&document),
                next_cursor: self.cursor_in(&document),
            },
            Err(e) => ExtractedPage {
                records: Err(e),
                next_cursor: None,
            },
        }
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

fn lookup<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(root, |value, segment| match value {
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => value.get(segment.as_str()),
    })
}

/// Renders a scalar as text; null, arrays and objects have none
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
