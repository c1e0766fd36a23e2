//! Run summary reporting

use crate::crawler::CrawlSummary;

/// Prints the summary of a run to stdout in a formatted manner
///
/// # Arguments
///
/// * `summary` - The counters produced by the pagination driver
/// * `config_hash` - Hash of the configuration the run used
pub fn print_summary(summary: &CrawlSummary, config_hash: &str) {
    println!("=== Harvest Summary ===\n");

    println!("Overview:");
    println!("  Config hash: {}", config_hash);
    println!("  Pages visited: {}", summary.pages_visited);
    println!("  Records emitted: {}", summary.records_emitted);
    println!();

    if summary.has_failures() {
        println!("Failures:");
        println!("  Pages failed: {}", summary.pages_failed);
        println!("  Extraction failures: {}", summary.extraction_failures);
        println!("  Sink failures: {}", summary.sink_failures);
        if summary.details_failed > 0 {
            println!("  Detail pages skipped: {}", summary.details_failed);
        }
        println!();
    }

    if summary.cancelled {
        println!("Run was cancelled before reaching its page bound.");
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} pages successfully processed)",
        summary.success_rate(),
        summary.pages_succeeded(),
        summary.pages_visited
    );
}
