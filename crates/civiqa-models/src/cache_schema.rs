/// The SQLite table both sides of the cache agree on: the fetcher writes
/// one snapshot row per domain, the query side reads it back.
///
/// ```sql
/// CREATE TABLE IF NOT EXISTS dataset_snapshots (
///     domain      TEXT PRIMARY KEY,
///     rows_json   TEXT NOT NULL,
///     row_count   INTEGER NOT NULL,
///     source      TEXT NOT NULL,
///     fetched_at  TEXT NOT NULL,
///     expires_at  TEXT NOT NULL
/// );
/// ```
///
/// A refresh replaces the whole row (`INSERT OR REPLACE`), never patches
/// `rows_json`, so readers see either the old snapshot or the new one.
/// Expired rows are kept: they are the fallback when a refresh fails.
pub const SNAPSHOT_TABLE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS dataset_snapshots (
    domain      TEXT PRIMARY KEY,
    rows_json   TEXT NOT NULL,
    row_count   INTEGER NOT NULL,
    source      TEXT NOT NULL,
    fetched_at  TEXT NOT NULL,
    expires_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_snapshot_expires ON dataset_snapshots(expires_at);
";

/// Key pattern conventions for the in-memory hot layer.
///
/// - Parsed snapshots: `dataset:{domain}` (e.g., `dataset:homicides`)
pub mod key_patterns {
    use crate::record::DomainId;

    pub fn dataset(domain: DomainId) -> String {
        format!("dataset:{domain}")
    }
}

/// A raw snapshot row as read from SQLite. Timestamps are RFC 3339 text.
#[derive(Debug, Clone)]
pub struct SnapshotRow {
    pub domain: String,
    pub rows_json: String,
    pub row_count: i64,
    pub source: String,
    pub fetched_at: String,
    pub expires_at: String,
}
