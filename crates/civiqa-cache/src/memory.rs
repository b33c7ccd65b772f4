use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use civiqa_models::Dataset;
use moka::future::Cache;

/// A parsed dataset held in the hot cache, together with the snapshot
/// expiry it was read under. Readers must re-check `expires_at`: the moka
/// TTL only bounds how long we keep the parse, not how long the snapshot
/// stays valid.
#[derive(Clone)]
pub struct HotEntry {
    pub expires_at: DateTime<Utc>,
    pub dataset: Arc<Dataset>,
}

/// In-memory hot cache backed by moka.
///
/// Holds fully parsed datasets so repeated questions against the same
/// domain skip both SQLite and JSON parsing.
pub struct MemoryCache {
    inner: Cache<String, HotEntry>,
}

impl MemoryCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<HotEntry> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: String, entry: HotEntry) {
        self.inner.insert(key, entry).await;
    }

    pub async fn invalidate(&self, key: &str) {
        self.inner.invalidate(key).await;
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civiqa_models::DomainId;

    fn entry() -> HotEntry {
        HotEntry {
            expires_at: Utc::now() + chrono::Duration::hours(1),
            dataset: Arc::new(Dataset::empty(DomainId::Homicides)),
        }
    }

    #[tokio::test]
    async fn insert_and_get() {
        let cache = MemoryCache::new(16, Duration::from_secs(60));
        cache.insert("dataset:homicides".to_string(), entry()).await;

        let result = cache.get("dataset:homicides").await;
        assert!(result.is_some());
        assert_eq!(result.unwrap().dataset.domain, DomainId::Homicides);
    }

    #[tokio::test]
    async fn get_missing() {
        let cache = MemoryCache::new(16, Duration::from_secs(60));
        assert!(cache.get("dataset:census").await.is_none());
    }

    #[tokio::test]
    async fn invalidate() {
        let cache = MemoryCache::new(16, Duration::from_secs(60));
        cache.insert("dataset:homicides".to_string(), entry()).await;
        cache.invalidate("dataset:homicides").await;

        assert!(cache.get("dataset:homicides").await.is_none());
    }

    #[tokio::test]
    async fn ttl_expiration() {
        let cache = MemoryCache::new(16, Duration::from_millis(50));
        cache.insert("dataset:homicides".to_string(), entry()).await;

        // Should exist immediately
        assert!(cache.get("dataset:homicides").await.is_some());

        // Wait for TTL
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Should be expired
        assert!(cache.get("dataset:homicides").await.is_none());
    }
}
