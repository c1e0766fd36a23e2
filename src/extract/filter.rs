//! Record text clean-up

use crate::config::FilterConfig;
use crate::extract::ExtractionError;
use regex::Regex;

/// Normalizes record text and drops records that don't qualify
///
/// Text is always trimmed. Listings that render a row number into the title
/// cell can have those digits removed, and a set of needles can restrict the
/// output to titles containing one of them (for example video extensions).
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    leading_digits: Option<Regex>,
    require_any: Vec<String>,
}

impl RecordFilter {
    /// A filter that only trims
    pub fn passthrough() -> Self {
        Self::default()
    }

    pub fn from_config(config: &FilterConfig) -> Result<Self, ExtractionError> {
        let mut filter = Self::passthrough().with_required(config.require_any.iter().cloned());
        if config.strip_leading_digits {
            filter = filter.strip_leading_digits()?;
        }
        Ok(filter)
    }

    /// Removes a run of digits at the start of the text
    pub fn strip_leading_digits(mut self) -> Result<Self, ExtractionError> {
        self.leading_digits = Some(Regex::new(r"^\d+")?);
        Ok(self)
    }

    /// Keeps only text containing one of the needles, ignoring case
    pub fn with_required<I, S>(mut self, needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.require_any = needles
            .into_iter()
            .map(|n| n.into().to_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        self
    }

    /// Cleans `text`, returning `None` if the record should be dropped
    pub fn apply(&self, text: &str) -> Option<String> {
        let mut cleaned = text.trim().to_string();

        if let Some(re) = &self.leading_digits {
            cleaned = re.replace(&cleaned, "").trim().to_string();
        }

        if cleaned.is_empty() {
            return None;
        }

        if !self.require_any.is_empty() {
            let lower = cleaned.to_lowercase();
            if !self.require_any.iter().any(|needle| lower.contains(needle)) {
                return None;
            }
        }

        Some(cleaned)
    }
}
