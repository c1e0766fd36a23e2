//! Sumi-Harvest main entry point
//!
//! This is the command-line interface for the Sumi-Harvest catalog harvester.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use sumi_harvest::config::{load_config_with_hash, validate, Config};
use sumi_harvest::crawler::{harvest, planned_urls, start_cursor};
use sumi_harvest::output::print_summary;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Number of page URLs listed by --dry-run
const DRY_RUN_PREVIEW: usize = 5;

/// Sumi-Harvest: A polite paginated catalog harvester
///
/// Sumi-Harvest walks the pages of a catalog (an HTML listing or a JSON API),
/// extracts one record per entry and writes them to a file or database,
/// waiting out rate limits and retrying transient failures.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A polite paginated catalog harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be fetched without fetching
    #[arg(long)]
    dry_run: bool,

    /// Override the first page number
    #[arg(long, value_name = "N")]
    start_page: Option<u32>,

    /// Override the number of pages to visit
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Override the output path
    #[arg(long, value_name = "PATH")]
    output: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli)?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_harvest(&config, &config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_harvest=info,warn"),
            1 => EnvFilter::new("sumi_harvest=debug,info"),
            2 => EnvFilter::new("sumi_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Applies command-line overrides and validates the result again
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    if let Some(start_page) = cli.start_page {
        config.crawler.start_page = start_page;
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
    }
    if let Some(output) = &cli.output {
        config.output.path = output.clone();
    }

    validate(config).context("Invalid command-line override")?;
    Ok(())
}

/// Handles the --dry-run mode: shows the resolved plan
fn handle_dry_run(config: &Config) {
    println!("=== Sumi-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Start: {}", start_cursor(config));
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Concurrency: {}", config.crawler.concurrency);
    if let Some(limit) = config.crawler.stop_after_empty_pages {
        println!("  Stop after {} empty pages", limit);
    }

    println!("\nFetch Policy:");
    println!("  Max retries: {}", config.fetch.max_retries);
    println!(
        "  Backoff: {:?} from {}ms up to {}ms",
        config.fetch.backoff, config.fetch.retry_backoff_ms, config.fetch.max_backoff_ms
    );
    println!(
        "  Rate-limit headers: {}",
        config.fetch.rate_limit_headers.join(", ")
    );
    match config.fetch.max_rate_limit_retries {
        Some(max) => println!("  Rate-limit waits: at most {} per page", max),
        None => println!("  Rate-limit waits: unbounded"),
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nTarget:");
    println!("  Template: {}", config.target.url_template);
    if config.target.allowed_domains.is_empty() {
        println!("  Allowed domains: any");
    } else {
        println!(
            "  Allowed domains: {}",
            config.target.allowed_domains.join(", ")
        );
    }
    if let Some(auth) = &config.target.auth {
        println!("  Credential: {} header from ${}", auth.header, auth.env);
    }

    if let Some(detail) = &config.detail {
        println!("\nDetail pages:");
        println!("  Template: {}", detail.url_template);
        if let Some(name) = &detail.parent_attribute {
            println!("  Listing text kept as: {}", name);
        }
    }

    println!("\nOutput:");
    println!("  Path: {}", config.output.path);
    println!("  Format: {:?}", config.output.format);
    println!("  Mode: {:?}", config.output.mode);

    let urls = planned_urls(config, DRY_RUN_PREVIEW);
    println!("\nFirst pages ({} of {}):", urls.len(), config.crawler.max_pages);
    for url in &urls {
        println!("  - {}", url);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main harvest operation
async fn handle_harvest(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    // Ctrl-C stops the run at the next wait or page boundary
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, finishing up...");
                cancel.cancel();
            }
        })
    };

    let result = harvest(config, config_hash, cancel).await;
    watcher.abort();

    let summary = result.context("Harvest could not start")?;
    println!();
    print_summary(&summary, config_hash);

    if summary.cancelled {
        tracing::warn!("Harvest was interrupted");
    } else {
        tracing::info!("Harvest completed");
    }
    Ok(())
}
