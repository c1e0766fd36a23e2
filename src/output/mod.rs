//! Output sinks for extracted records
//!
//! This module handles:
//! - Writing records as plain lines or JSON lines
//! - Storing records in a SQLite database
//! - Collecting records in memory
//! - Printing the run summary

mod memory;
mod sqlite;
pub mod stats;
mod text_file;
mod traits;

pub use memory::MemorySink;
pub use sqlite::SqliteSink;
pub use stats::print_summary;
pub use text_file::{LineFormat, TextFileSink};
pub use traits::{Sink, SinkError, SinkResult};

use crate::config::{OutputConfig, OutputFormat};
use std::path::Path;
use std::sync::Arc;

/// Opens the sink described by the configuration
///
/// # Arguments
///
/// * `config` - The `[output]` section
/// * `config_hash` - Hash of the run configuration, stored by the SQLite sink
///
/// # Returns
///
/// * `Ok(Arc<dyn Sink>)` - A sink ready to be shared by every page
/// * `Err(SinkError)` - The destination could not be opened
pub fn open_sink(config: &OutputConfig, config_hash: &str) -> SinkResult<Arc<dyn Sink>> {
    let path = Path::new(&config.path);

    let sink: Arc<dyn Sink> = match config.format {
        OutputFormat::Lines => Arc::new(
            TextFileSink::open(path, LineFormat::Plain, config.mode)?.with_echo(config.echo),
        ),
        OutputFormat::Jsonl => Arc::new(
            TextFileSink::open(path, LineFormat::Json, config.mode)?.with_echo(config.echo),
        ),
        OutputFormat::Sqlite => Arc::new(SqliteSink::open(path, config.mode, config_hash)?),
    };

    tracing::info!(
        "Writing {:?} output to {} ({:?} mode)",
        config.format,
        path.display(),
        config.mode
    );
    Ok(sink)
}
