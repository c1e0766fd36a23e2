//! Run counters

/// Counters describing one pagination run
///
/// A page counts as visited once the driver has finished with it, whether or
/// not it succeeded. `extraction_failures` are pages that were fetched but
/// could not be read; they are not included in `pages_failed`.
/// `details_failed` counts listing records whose detail page was skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub pages_visited: u64,
    pub records_emitted: u64,
    pub pages_failed: u64,
    pub extraction_failures: u64,
    pub sink_failures: u64,
    pub details_failed: u64,

    /// The run stopped because it was cancelled
    pub cancelled: bool,
}

impl CrawlSummary {
    /// Creates a new empty crawl summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Pages that were fetched and read successfully
    pub fn pages_succeeded(&self) -> u64 {
        self.pages_visited
            .saturating_sub(self.pages_failed)
            .saturating_sub(self.extraction_failures)
    }

    pub fn has_failures(&self) -> bool {
        self.pages_failed > 0
            || self.extraction_failures > 0
            || self.sink_failures > 0
            || self.details_failed > 0
    }

    /// Returns the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.pages_visited == 0 {
            return 0.0;
        }
        (self.pages_succeeded() as f64 / self.pages_visited as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crawl_summary_new() {
        let summary = CrawlSummary::new();
        assert_eq!(summary.pages_visited, 0);
        assert!(!summary.has_failures());
        assert!(!summary.cancelled);
    }

    #[test]
    fn test_success_rate() {
        let summary = CrawlSummary {
            pages_visited: 10,
            pages_failed: 1,
            extraction_failures: 1,
            ..CrawlSummary::new()
        };
        assert_eq!(summary.pages_succeeded(), 8);
        assert!((summary.success_rate() - 80.0).abs() < 0.01);
        assert!(summary.has_failures());
    }

    #[test]
    fn test_skipped_details_are_failures() {
        let summary = CrawlSummary {
            pages_visited: 1,
            details_failed: 1,
            ..CrawlSummary::new()
        };
        assert!(summary.has_failures());
        assert_eq!(summary.success_rate(), 100.0);
    }

    #[test]
    fn test_success_rate_zero_pages() {
        assert_eq!(CrawlSummary::new().success_rate(), 0.0);
    }
}
