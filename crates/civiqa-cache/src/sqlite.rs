use chrono::Utc;
use civiqa_models::cache_schema::SnapshotRow;
use civiqa_models::{DomainId, SNAPSHOT_TABLE_DDL};
use rusqlite::Connection;

use crate::error::CacheError;

/// Metadata for one domain snapshot, without the row payload.
#[derive(Debug, Clone)]
pub struct SnapshotMeta {
    pub domain: String,
    pub row_count: i64,
    pub source: String,
    pub fetched_at: String,
    pub expires_at: String,
}

/// Read-only SQLite snapshot accessor.
///
/// The snapshot database is written by the fetcher daemon and read here.
/// Expired snapshots are not deleted, so `get_snapshot_any` can serve
/// them as a fallback when a refresh fails.
pub struct SqliteReader {
    conn: Connection,
}

impl SqliteReader {
    /// Open a read-only connection to the shared snapshot database.
    pub fn open(path: &str) -> Result<Self, CacheError> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Open an in-memory database. Useful for testing - creates the schema automatically.
    /// The in-memory DB is writable so tests can seed data.
    pub fn open_in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SNAPSHOT_TABLE_DDL)?;
        Ok(Self { conn })
    }

    /// Get the snapshot for a domain if it has not expired yet.
    pub fn get_valid_snapshot(&self, domain: DomainId) -> Result<Option<SnapshotRow>, CacheError> {
        let now = Utc::now().to_rfc3339();
        let mut stmt = self.conn.prepare_cached(
            "SELECT domain, rows_json, row_count, source, fetched_at, expires_at \
             FROM dataset_snapshots WHERE domain = ?1 AND expires_at > ?2",
        )?;

        let result = stmt.query_row(rusqlite::params![domain.as_str(), now], |row| {
            Ok(SnapshotRow {
                domain: row.get(0)?,
                rows_json: row.get(1)?,
                row_count: row.get(2)?,
                source: row.get(3)?,
                fetched_at: row.get(4)?,
                expires_at: row.get(5)?,
            })
        });

        match result {
            Ok(row) => Ok(Some(row)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(CacheError::Sqlite(e)),
        }
    }

    /// Get the snapshot for a domain regardless of expiry. This is the
    /// stale fallback path for when a refresh fails.
    pub fn get_snapshot_any(&self, domain: DomainId) -> Result<Option<SnapshotRow>, CacheError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT domain, rows_json, row_count, source, fetched_at, expires_at \
             FROM dataset_snapshots WHERE domain = ?1",
        )?;

        let result = stmt.query_row(rusqlite::params![domain.as_str()], |row| {
            Ok(SnapshotRow {
                domain: row.get(0)?,
                rows_json: row.get(1)?,
                row_count: row.get(2)?,
                source: row.get(3)?,
                fetched_at: row.get(4)?,
                expires_at: row.get(5)?,
            })
        });

        match result {
            Ok(row) => Ok(Some(row)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(CacheError::Sqlite(e)),
        }
    }

    /// Cheap freshness probe: does a non-expired snapshot exist for the
    /// domain? Avoids reading `rows_json` entirely.
    pub fn is_snapshot_valid(&self, domain: DomainId) -> Result<bool, CacheError> {
        let now = Utc::now().to_rfc3339();
        let mut stmt = self.conn.prepare_cached(
            "SELECT 1 FROM dataset_snapshots WHERE domain = ?1 AND expires_at > ?2",
        )?;

        let result = stmt.query_row(rusqlite::params![domain.as_str(), now], |_| Ok(()));
        match result {
            Ok(()) => Ok(true),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
            Err(e) => Err(CacheError::Sqlite(e)),
        }
    }

    /// Insert a snapshot row. In production the fetcher writes directly to
    /// SQLite; this method is available for testing.
    pub fn insert_snapshot(&self, row: &SnapshotRow) -> Result<(), CacheError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO dataset_snapshots \
             (domain, rows_json, row_count, source, fetched_at, expires_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                row.domain,
                row.rows_json,
                row.row_count,
                row.source,
                row.fetched_at,
                row.expires_at,
            ],
        )?;
        Ok(())
    }

    /// Metadata for every stored snapshot, ordered by domain name.
    pub fn list_meta(&self) -> Result<Vec<SnapshotMeta>, CacheError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT domain, row_count, source, fetched_at, expires_at \
             FROM dataset_snapshots ORDER BY domain",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(SnapshotMeta {
                    domain: row.get(0)?,
                    row_count: row.get(1)?,
                    source: row.get(2)?,
                    fetched_at: row.get(3)?,
                    expires_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn make_row(domain: DomainId, ttl_seconds: i64) -> SnapshotRow {
        let now = Utc::now();
        SnapshotRow {
            domain: domain.as_str().to_string(),
            rows_json: r#"[{"year": 2023, "district": "11"}]"#.to_string(),
            row_count: 1,
            source: "test".to_string(),
            fetched_at: now.to_rfc3339(),
            expires_at: (now + Duration::seconds(ttl_seconds)).to_rfc3339(),
        }
    }

    #[test]
    fn get_valid_snapshot_hits() {
        let reader = SqliteReader::open_in_memory().unwrap();
        reader
            .insert_snapshot(&make_row(DomainId::Homicides, 300))
            .unwrap();

        let result = reader.get_valid_snapshot(DomainId::Homicides).unwrap();
        assert!(result.is_some());
        assert_eq!(result.unwrap().row_count, 1);
    }

    #[test]
    fn get_missing_domain() {
        let reader = SqliteReader::open_in_memory().unwrap();
        let result = reader.get_valid_snapshot(DomainId::Census).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn expired_snapshot_filtered_from_valid() {
        let reader = SqliteReader::open_in_memory().unwrap();
        reader
            .insert_snapshot(&make_row(DomainId::Homicides, -10))
            .unwrap();

        assert!(reader
            .get_valid_snapshot(DomainId::Homicides)
            .unwrap()
            .is_none());
    }

    #[test]
    fn validity_probe_tracks_expiry() {
        let reader = SqliteReader::open_in_memory().unwrap();
        reader
            .insert_snapshot(&make_row(DomainId::Homicides, 300))
            .unwrap();
        reader
            .insert_snapshot(&make_row(DomainId::Census, -10))
            .unwrap();

        assert!(reader.is_snapshot_valid(DomainId::Homicides).unwrap());
        assert!(!reader.is_snapshot_valid(DomainId::Census).unwrap());
        assert!(!reader.is_snapshot_valid(DomainId::PropertySales).unwrap());
    }

    #[test]
    fn expired_snapshot_still_readable_as_any() {
        let reader = SqliteReader::open_in_memory().unwrap();
        reader
            .insert_snapshot(&make_row(DomainId::Homicides, -10))
            .unwrap();

        let stale = reader.get_snapshot_any(DomainId::Homicides).unwrap();
        assert!(stale.is_some());
        assert_eq!(stale.unwrap().domain, "homicides");
    }

    #[test]
    fn replace_overwrites_previous_snapshot() {
        let reader = SqliteReader::open_in_memory().unwrap();
        reader
            .insert_snapshot(&make_row(DomainId::Homicides, 300))
            .unwrap();

        let mut updated = make_row(DomainId::Homicides, 600);
        updated.rows_json = r#"[{"year": 2024}, {"year": 2024}]"#.to_string();
        updated.row_count = 2;
        reader.insert_snapshot(&updated).unwrap();

        let result = reader
            .get_valid_snapshot(DomainId::Homicides)
            .unwrap()
            .unwrap();
        assert_eq!(result.row_count, 2);
    }

    #[test]
    fn list_meta_orders_by_domain() {
        let reader = SqliteReader::open_in_memory().unwrap();
        reader
            .insert_snapshot(&make_row(DomainId::Socioeconomic, 300))
            .unwrap();
        reader
            .insert_snapshot(&make_row(DomainId::Census, 300))
            .unwrap();

        let meta = reader.list_meta().unwrap();
        assert_eq!(meta.len(), 2);
        assert_eq!(meta[0].domain, "census");
        assert_eq!(meta[1].domain, "socioeconomic");
    }
}
