//! In-process record collection

use crate::extract::Record;
use crate::output::traits::{poisoned, Sink, SinkResult};
use std::sync::Mutex;

/// Keeps every accepted record in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Record>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the records accepted so far, in arrival order
    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// The texts of the records accepted so far
    pub fn texts(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.text).collect()
    }
}

impl Sink for MemorySink {
    fn accept(&self, record: Record) -> SinkResult<()> {
        self.records.lock().map_err(poisoned)?.push(record);
        Ok(())
    }
}
