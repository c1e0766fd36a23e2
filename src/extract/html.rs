//! Record extraction from HTML listings

use crate::extract::{ContentKind, ExtractionError, PageExtractor, Record, RecordFilter};
use scraper::{ElementRef, Html, Selector};

/// Extracts one record per listing row
///
/// Every element matching the row selector is a candidate record. Its text is
/// the concatenated text of the elements matching the field selector inside
/// the row, or the row's own text when no field selector is set. If the first
/// matched field element carries an `href`, it is kept as the `href`
/// attribute.
///
/// # Example
///
/// ```
/// use sumi_harvest::extract::{HtmlExtractor, RecordFilter};
/// use sumi_harvest::{ContentKind, PageExtractor};
///
/// let extractor = HtmlExtractor::new(
///     "table tbody tr",
///     Some("td:nth-child(2) a[href^='/view']"),
///     RecordFilter::passthrough(),
/// )
/// .unwrap();
///
/// let html = r#"<table><tbody>
///     <tr><td>Anime</td><td><a href="/view/1">Show - 01</a></td></tr>
/// </tbody></table>"#;
/// let records = extractor.extract(html.as_bytes(), ContentKind::Html).unwrap();
/// assert_eq!(records[0].text, "Show - 01");
/// ```
#[derive(Debug, Clone)]
pub struct HtmlExtractor {
    row: Selector,
    field: Option<Selector>,
    filter: RecordFilter,
}

impl HtmlExtractor {
    /// Compiles the selectors
    ///
    /// # Arguments
    ///
    /// * `row_selector` - CSS selector matching one element per record
    /// * `field_selector` - CSS selector for the text inside a row
    /// * `filter` - Clean-up applied to every extracted text
    ///
    /// # Returns
    ///
    /// * `Ok(HtmlExtractor)` - Both selectors compiled
    /// * `Err(ExtractionError::InvalidSelector)` - A selector is malformed
    pub fn new(
        row_selector: &str,
        field_selector: Option<&str>,
        filter: RecordFilter,
    ) -> Result<Self, ExtractionError> {
        let row = compile(row_selector)?;
        let field = field_selector.map(compile).transpose()?;
        Ok(Self { row, field, filter })
    }

    fn read_row(&self, row: ElementRef<'_>) -> Option<Record> {
        let (text, href) = match &self.field {
            Some(field) => {
                let matches: Vec<ElementRef<'_>> = row.select(field).collect();
                let href = matches
                    .first()
                    .and_then(|el| el.value().attr("href"))
                    .map(str::to_string);
                let text = matches
                    .iter()
                    .flat_map(|el| el.text())
                    .collect::<String>();
                (text, href)
            }
            None => (
                row.text().collect::<String>(),
                row.value().attr("href").map(str::to_string),
            ),
        };

        let cleaned = self.filter.apply(&text)?;
        let record = Record::new(cleaned);
        Some(match href {
            Some(href) => record.with_attribute("href", href),
            None => record,
        })
    }
}

impl PageExtractor for HtmlExtractor {
    fn content_kind(&self) -> ContentKind {
        ContentKind::Html
    }

    fn extract(&self, body: &[u8], kind: ContentKind) -> Result<Vec<Record>, ExtractionError> {
        if kind != ContentKind::Html {
            return Err(ExtractionError::UnsupportedContent {
                extractor: "HTML",
                kind,
            });
        }

        let document = Html::parse_document(&String::from_utf8_lossy(body));
        Ok(document
            .select(&self.row)
            .filter_map(|row| self.read_row(row))
            .collect())
    }
}

fn compile(selector: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(selector).map_err(|e| ExtractionError::InvalidSelector {
        selector: selector.to_string(),
        reason: format!("{:?}", e),
    })
}
