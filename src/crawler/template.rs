//! Building page URLs from cursors

use crate::crawler::PageCursor;
use crate::extract::Record;
use url::form_urlencoded::byte_serialize;

/// Maps a cursor to the URL of its page
pub trait UrlTemplate: Send + Sync {
    fn url_for(&self, cursor: &PageCursor) -> String;
}

impl<F> UrlTemplate for F
where
    F: Fn(&PageCursor) -> String + Send + Sync,
{
    fn url_for(&self, cursor: &PageCursor) -> String {
        self(cursor)
    }
}

/// A URL pattern with `{page}` and `{cursor}` placeholders
///
/// `{page}` is replaced by the page number of a `Page` cursor. `{cursor}` is
/// replaced by the URL-encoded token of a `Token` cursor (or by the page
/// number, so one pattern can serve both).
///
/// # Example
///
/// ```
/// use sumi_harvest::crawler::{PageCursor, PatternTemplate, UrlTemplate};
///
/// let template = PatternTemplate::new("https://nyaa.land/?f=0&c=1_0&q=&p={page}");
/// assert_eq!(
///     template.url_for(&PageCursor::Page(2)),
///     "https://nyaa.land/?f=0&c=1_0&q=&p=2"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternTemplate {
    pattern: String,
}

impl PatternTemplate {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }
}

impl UrlTemplate for PatternTemplate {
    fn url_for(&self, cursor: &PageCursor) -> String {
        match cursor {
            PageCursor::Page(n) => {
                let n = n.to_string();
                self.pattern.replace("{page}", &n).replace("{cursor}", &n)
            }
            PageCursor::Token(token) => {
                let encoded: String = byte_serialize(token.as_bytes()).collect();
                self.pattern.replace("{cursor}", &encoded)
            }
        }
    }
}

/// A URL pattern filled in from the fields of a record
///
/// `{text}` stands for the record text and any other `{name}` for the
/// attribute of that name. Values are URL-encoded.
///
/// # Example
///
/// ```
/// use sumi_harvest::crawler::RecordTemplate;
/// use sumi_harvest::Record;
///
/// let template = RecordTemplate::new("https://jimaku.cc/api/entries/{id}/files");
/// let entry = Record::new("Frieren").with_attribute("id", "42");
/// assert_eq!(
///     template.url_for_record(&entry).unwrap(),
///     "https://jimaku.cc/api/entries/42/files"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTemplate {
    pattern: String,
}

impl RecordTemplate {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    /// Names of the placeholders, in pattern order
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut rest = self.pattern.as_str();
        while let Some((name, after)) = next_placeholder(rest) {
            names.push(name);
            rest = after;
        }
        names
    }

    /// Fills every placeholder with the value `value_of` returns for its name
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The URL
    /// * `Err(&str)` - Name of the first placeholder without a value
    pub fn fill<F>(&self, mut value_of: F) -> Result<String, &str>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut url = String::with_capacity(self.pattern.len());
        let mut rest = self.pattern.as_str();

        while let Some(open) = rest.find('{') {
            let Some((name, after)) = next_placeholder(&rest[open..]) else {
                break;
            };
            let value = value_of(name).ok_or(name)?;
            url.push_str(&rest[..open]);
            url.extend(byte_serialize(value.as_bytes()));
            rest = after;
        }

        url.push_str(rest);
        Ok(url)
    }

    /// The URL for `record`, or the name of the field it lacks
    pub fn url_for_record(&self, record: &Record) -> Result<String, &str> {
        self.fill(|name| match name {
            "text" => Some(record.text.clone()),
            _ => record.attributes.get(name).cloned(),
        })
    }
}

/// Splits off the first `{name}` of `input`, returning the name and the rest
fn next_placeholder(input: &str) -> Option<(&str, &str)> {
    let open = input.find('{')?;
    let close = open + input[open..].find('}')?;
    Some((&input[open + 1..close], &input[close + 1..]))
}
