use chrono::Duration;
use civiqa_models::{Dataset, SNAPSHOT_TABLE_DDL};
use rusqlite::Connection;

use crate::error::FetchError;

/// Writable SQLite snapshot writer.
///
/// Opens the shared snapshot database in read-write mode with WAL journal
/// for concurrent read/write access (the query side can read while the
/// fetcher writes).
pub struct SqliteWriter {
    conn: Connection,
}

impl SqliteWriter {
    /// Open a read-write connection to the snapshot database.
    /// Creates the schema if it doesn't exist. Enables WAL mode.
    pub fn open(path: &str) -> Result<Self, FetchError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SNAPSHOT_TABLE_DDL)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database for testing.
    pub fn open_in_memory() -> Result<Self, FetchError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SNAPSHOT_TABLE_DDL)?;
        Ok(Self { conn })
    }

    /// Replace the domain's snapshot in a single statement. The expiry is
    /// computed from the dataset's own fetch time, not from the wall clock
    /// at write time.
    pub fn write_snapshot(
        &self,
        dataset: &Dataset,
        source: &str,
        ttl_hours: u64,
    ) -> Result<(), FetchError> {
        let rows_json = serde_json::to_string(&dataset.rows)?;
        let expires_at = dataset.fetched_at + Duration::hours(ttl_hours as i64);

        self.conn.execute(
            "INSERT OR REPLACE INTO dataset_snapshots \
             (domain, rows_json, row_count, source, fetched_at, expires_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                dataset.domain.as_str(),
                rows_json,
                dataset.len() as i64,
                source,
                dataset.fetched_at.to_rfc3339(),
                expires_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Count all stored snapshots.
    pub fn count(&self) -> Result<usize, FetchError> {
        let count: usize =
            self.conn
                .query_row("SELECT COUNT(*) FROM dataset_snapshots", [], |row| {
                    row.get(0)
                })?;
        Ok(count)
    }
}
