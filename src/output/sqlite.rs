//! SQLite record output

use crate::config::WriteMode;
use crate::extract::Record;
use crate::output::traits::{poisoned, Sink, SinkResult};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

/// SQL schema for the records table
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL,
    attributes TEXT NOT NULL,
    harvested_at TEXT NOT NULL,
    config_hash TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_text ON records(text);
"#;

/// Stores records as rows of a SQLite table
///
/// Attributes are kept as a JSON object. Every row is stamped with the time
/// it was written and the hash of the configuration that produced it.
pub struct SqliteSink {
    conn: Mutex<Connection>,
    config_hash: String,
}

impl SqliteSink {
    /// Opens or creates the database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `mode` - `Overwrite` deletes rows left by earlier runs
    /// * `config_hash` - Stored alongside every record
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteSink)` - Successfully opened/created database
    /// * `Err(SinkError)` - Failed to open database or create the schema
    pub fn open(path: &Path, mode: WriteMode, config_hash: &str) -> SinkResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;

        Self::prepare(conn, mode, config_hash)
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory(config_hash: &str) -> SinkResult<Self> {
        Self::prepare(Connection::open_in_memory()?, WriteMode::Overwrite, config_hash)
    }

    fn prepare(conn: Connection, mode: WriteMode, config_hash: &str) -> SinkResult<Self> {
        conn.execute_batch(SCHEMA_SQL)?;

        if mode == WriteMode::Overwrite {
            let removed = conn.execute("DELETE FROM records", [])?;
            if removed > 0 {
                tracing::debug!("Cleared {} records from a previous run", removed);
            }
        }

        Ok(Self {
            conn: Mutex::new(conn),
            config_hash: config_hash.to_string(),
        })
    }

    /// Reads back every stored record in insertion order
    pub fn records(&self) -> SinkResult<Vec<Record>> {
        let conn = self.conn.lock().map_err(poisoned)?;
        let mut stmt = conn.prepare("SELECT text, attributes FROM records ORDER BY id")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(text, attributes)| {
                let attributes: BTreeMap<String, String> = serde_json::from_str(&attributes)?;
                Ok(Record { text, attributes })
            })
            .collect()
    }
}

impl Sink for SqliteSink {
    fn accept(&self, record: Record) -> SinkResult<()> {
        let attributes = serde_json::to_string(&record.attributes)?;
        let now = Utc::now().to_rfc3339();

        let conn = self.conn.lock().map_err(poisoned)?;
        conn.execute(
            "INSERT INTO records (text, attributes, harvested_at, config_hash) VALUES (?1, ?2, ?3, ?4)",
            params![record.text, attributes, now, self.config_hash],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_accept_and_read_back() {
        let sink = SqliteSink::open_in_memory("abc123").unwrap();
        sink.accept(Record::new("A").with_attribute("id", "1")).unwrap();
        sink.accept(Record::new("B")).unwrap();

        let records = sink.records().unwrap();
        assert_eq!(
            records,
            vec![Record::new("A").with_attribute("id", "1"), Record::new("B")]
        );
    }

    #[test]
    fn test_config_hash_is_stored() {
        let sink = SqliteSink::open_in_memory("abc123").unwrap();
        sink.accept(Record::new("A")).unwrap();

        let conn = sink.conn.lock().unwrap();
        let hash: String = conn
            .query_row("SELECT config_hash FROM records", [], |row| row.get(0))
            .unwrap();
        assert_eq!(hash, "abc123");
    }

    #[test]
    fn test_overwrite_and_append_modes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.db");

        {
            let sink = SqliteSink::open(&path, WriteMode::Overwrite, "h").unwrap();
            sink.accept(Record::new("first run")).unwrap();
        }
        {
            let sink = SqliteSink::open(&path, WriteMode::Append, "h").unwrap();
            sink.accept(Record::new("second run")).unwrap();
            assert_eq!(sink.records().unwrap().len(), 2);
        }

        let sink = SqliteSink::open(&path, WriteMode::Overwrite, "h").unwrap();
        assert!(sink.records().unwrap().is_empty());
    }
}
