use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use civiqa_models::cache_schema::{key_patterns, SnapshotRow};
use civiqa_models::{Dataset, DomainId, Record};
use tracing::debug;

use crate::error::CacheError;
use crate::memory::{HotEntry, MemoryCache};
use crate::sqlite::{SnapshotMeta, SqliteReader};

/// Read-through dataset cache: checks moka (hot) → SQLite (snapshot) → None.
///
/// On SQLite hit, the parsed dataset is promoted to the moka hot cache for
/// subsequent fast access. Hot entries carry the snapshot expiry and are
/// re-checked on every read, so a valid answer here never needs the network.
///
/// SQLite access is synchronized via `Mutex` since `rusqlite::Connection` is not `Sync`.
pub struct CacheReader {
    memory: MemoryCache,
    sqlite: Mutex<SqliteReader>,
}

impl CacheReader {
    pub fn new(sqlite: SqliteReader, max_capacity: u64, memory_ttl: Duration) -> Self {
        Self {
            memory: MemoryCache::new(max_capacity, memory_ttl),
            sqlite: Mutex::new(sqlite),
        }
    }

    /// Get the still-valid dataset for a domain, or None if the snapshot is
    /// missing or expired.
    pub async fn dataset(&self, domain: DomainId) -> Result<Option<Arc<Dataset>>, CacheError> {
        let key = key_patterns::dataset(domain);

        // 1. Check moka hot cache, re-validating the snapshot expiry.
        if let Some(entry) = self.memory.get(&key).await {
            if entry.expires_at > Utc::now() {
                return Ok(Some(entry.dataset));
            }
            self.memory.invalidate(&key).await;
        }

        // 2. Check SQLite (expiry filtering happens in the query).
        let row = {
            let sqlite = self
                .sqlite
                .lock()
                .map_err(|e| CacheError::Unavailable(format!("SQLite mutex poisoned: {e}")))?;
            sqlite.get_valid_snapshot(domain)?
        };

        if let Some(row) = row {
            let (expires_at, dataset) = parse_snapshot(domain, &row)?;
            let dataset = Arc::new(dataset);
            debug!(domain = %domain, rows = dataset.len(), "promoted snapshot to hot cache");
            self.memory
                .insert(
                    key,
                    HotEntry {
                        expires_at,
                        dataset: Arc::clone(&dataset),
                    },
                )
                .await;
            return Ok(Some(dataset));
        }

        Ok(None)
    }

    /// Get the dataset for a domain even if its snapshot has expired.
    ///
    /// Used when a refresh fails and stale rows beat no rows. Stale reads
    /// are not promoted to the hot cache, so a later successful refresh is
    /// picked up immediately.
    pub async fn dataset_stale(
        &self,
        domain: DomainId,
    ) -> Result<Option<Arc<Dataset>>, CacheError> {
        let row = {
            let sqlite = self
                .sqlite
                .lock()
                .map_err(|e| CacheError::Unavailable(format!("SQLite mutex poisoned: {e}")))?;
            sqlite.get_snapshot_any(domain)?
        };

        match row {
            Some(row) => {
                let (_, dataset) = parse_snapshot(domain, &row)?;
                Ok(Some(Arc::new(dataset)))
            }
            None => Ok(None),
        }
    }

    /// Cheap freshness probe, bypassing the hot cache and the row payload.
    pub fn snapshot_valid(&self, domain: DomainId) -> Result<bool, CacheError> {
        let sqlite = self
            .sqlite
            .lock()
            .map_err(|e| CacheError::Unavailable(format!("SQLite mutex poisoned: {e}")))?;
        sqlite.is_snapshot_valid(domain)
    }

    /// Drop the hot entry for a domain so the next read goes back to SQLite.
    /// The fetcher calls this after writing a fresh snapshot.
    pub async fn invalidate(&self, domain: DomainId) {
        self.memory.invalidate(&key_patterns::dataset(domain)).await;
    }

    /// Metadata for every stored snapshot.
    pub fn list_meta(&self) -> Result<Vec<SnapshotMeta>, CacheError> {
        let sqlite = self
            .sqlite
            .lock()
            .map_err(|e| CacheError::Unavailable(format!("SQLite mutex poisoned: {e}")))?;
        sqlite.list_meta()
    }

    /// Get the number of entries in the hot moka cache.
    pub fn hot_cache_size(&self) -> u64 {
        self.memory.entry_count()
    }
}

fn parse_snapshot(domain: DomainId, row: &SnapshotRow) -> Result<(DateTime<Utc>, Dataset), CacheError> {
    let rows: Vec<Record> = serde_json::from_str(&row.rows_json)?;
    let fetched_at = parse_rfc3339(&row.fetched_at)?;
    let expires_at = parse_rfc3339(&row.expires_at)?;
    Ok((
        expires_at,
        Dataset {
            domain,
            rows,
            fetched_at,
        },
    ))
}

fn parse_rfc3339(text: &str) -> Result<DateTime<Utc>, CacheError> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CacheError::Unavailable(format!("bad timestamp in snapshot: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use serde_json::json;

    fn make_snapshot(domain: DomainId, rows_json: &str, row_count: i64, ttl_seconds: i64) -> SnapshotRow {
        let now = Utc::now();
        SnapshotRow {
            domain: domain.as_str().to_string(),
            rows_json: rows_json.to_string(),
            row_count,
            source: "test".to_string(),
            fetched_at: now.to_rfc3339(),
            expires_at: (now + ChronoDuration::seconds(ttl_seconds)).to_rfc3339(),
        }
    }

    fn setup_reader() -> CacheReader {
        let sqlite = SqliteReader::open_in_memory().unwrap();
        sqlite
            .insert_snapshot(&make_snapshot(
                DomainId::Homicides,
                r#"[{"year": 2023, "district": "11"}, {"year": 2022, "district": "7"}]"#,
                2,
                300,
            ))
            .unwrap();
        sqlite
            .insert_snapshot(&make_snapshot(
                DomainId::Census,
                r#"[{"community_area": "Austin", "total_population": 96557}]"#,
                1,
                -10,
            ))
            .unwrap();

        CacheReader::new(sqlite, 16, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn read_through_sqlite_to_moka() {
        let reader = setup_reader();

        // First read should come from SQLite
        let dataset = reader.dataset(DomainId::Homicides).await.unwrap().unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.rows[0].get("year"), Some(&json!(2023)));

        // After first read, the entry should be promoted to moka.
        let hot = reader.memory.get("dataset:homicides").await;
        assert!(hot.is_some());

        let again = reader.dataset(DomainId::Homicides).await.unwrap().unwrap();
        assert_eq!(again.len(), 2);
    }

    #[tokio::test]
    async fn expired_snapshot_not_served_as_valid() {
        let reader = setup_reader();

        let valid = reader.dataset(DomainId::Census).await.unwrap();
        assert!(valid.is_none());
    }

    #[tokio::test]
    async fn expired_snapshot_served_stale() {
        let reader = setup_reader();

        let stale = reader.dataset_stale(DomainId::Census).await.unwrap();
        assert!(stale.is_some());
        assert_eq!(
            stale.unwrap().rows[0].get_str("community_area"),
            Some("Austin")
        );
    }

    #[tokio::test]
    async fn missing_domain_returns_none() {
        let reader = setup_reader();

        assert!(reader.dataset(DomainId::PropertySales).await.unwrap().is_none());
        assert!(reader
            .dataset_stale(DomainId::PropertySales)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn invalidate_clears_hot_entry() {
        let reader = setup_reader();

        reader.dataset(DomainId::Homicides).await.unwrap();
        assert!(reader.memory.get("dataset:homicides").await.is_some());

        reader.invalidate(DomainId::Homicides).await;
        assert!(reader.memory.get("dataset:homicides").await.is_none());

        // A fresh read falls through to SQLite and still works.
        let dataset = reader.dataset(DomainId::Homicides).await.unwrap();
        assert!(dataset.is_some());
    }

    #[tokio::test]
    async fn malformed_rows_json_is_an_error() {
        let sqlite = SqliteReader::open_in_memory().unwrap();
        sqlite
            .insert_snapshot(&make_snapshot(DomainId::Homicides, "not json", 0, 300))
            .unwrap();
        let reader = CacheReader::new(sqlite, 16, Duration::from_secs(60));

        let result = reader.dataset(DomainId::Homicides).await;
        assert!(matches!(result, Err(CacheError::Json(_))));
    }
}
