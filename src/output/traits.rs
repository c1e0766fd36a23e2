//! The sink interface

use crate::extract::Record;
use thiserror::Error;

/// Errors that can occur while persisting records
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Sink lock poisoned: {0}")]
    Poisoned(String),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Destination for extracted records
///
/// Sinks are shared by every page of a run, including pages processed
/// concurrently, so implementations serialize writes internally. A record
/// is either written whole or not at all.
pub trait Sink: Send + Sync {
    /// Persists one record
    ///
    /// # Arguments
    ///
    /// * `record` - The record to store; ownership moves into the sink
    fn accept(&self, record: Record) -> SinkResult<()>;

    /// Pushes buffered records to their destination
    fn flush(&self) -> SinkResult<()> {
        Ok(())
    }
}

/// Maps a poisoned mutex onto a sink error
pub(crate) fn poisoned<T>(e: std::sync::PoisonError<T>) -> SinkError {
    SinkError::Poisoned(e.to_string())
}
