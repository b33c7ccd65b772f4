use std::sync::{Arc, Mutex};
use std::time::Duration;

use civiqa_cache::CacheReader;
use civiqa_models::{Dataset, DomainId};
use tracing::{info, warn};

use crate::client::DataPortal;
use crate::error::FetchError;
use crate::source::{fetch_domain, DomainSource};
use crate::store::SqliteWriter;

/// Keeps every configured domain's dataset available.
///
/// Valid snapshots are served from the cache without touching the network;
/// missing or expired ones are refetched and persisted; a failed refresh
/// falls back to the stale snapshot when one exists, and only errors when
/// there is nothing at all to serve.
pub struct DatasetService {
    portal: Arc<dyn DataPortal>,
    reader: Arc<CacheReader>,
    writer: Arc<Mutex<SqliteWriter>>,
    sources: Vec<DomainSource>,
    pacing: Duration,
}

impl DatasetService {
    pub fn new(
        portal: Arc<dyn DataPortal>,
        reader: Arc<CacheReader>,
        writer: Arc<Mutex<SqliteWriter>>,
        sources: Vec<DomainSource>,
        pacing: Duration,
    ) -> Self {
        Self {
            portal,
            reader,
            writer,
            sources,
            pacing,
        }
    }

    pub fn sources(&self) -> &[DomainSource] {
        &self.sources
    }

    pub fn domains(&self) -> Vec<DomainId> {
        self.sources.iter().map(|s| s.domain).collect()
    }

    fn source_for(&self, domain: DomainId) -> Result<&DomainSource, FetchError> {
        self.sources
            .iter()
            .find(|s| s.domain == domain)
            .ok_or(FetchError::UnknownDomain(domain))
    }

    /// Get a usable dataset for the domain, fetching only when the snapshot
    /// is missing or expired.
    pub async fn ensure(&self, domain: DomainId) -> Result<Arc<Dataset>, FetchError> {
        let source = self.source_for(domain)?;

        if let Some(dataset) = self.reader.dataset(domain).await? {
            return Ok(dataset);
        }

        match self.refresh(source).await {
            Ok(dataset) => Ok(dataset),
            Err(e) => {
                warn!(domain = %domain, error = %e, "refresh failed, trying stale snapshot");
                match self.reader.dataset_stale(domain).await? {
                    Some(stale) => {
                        info!(domain = %domain, rows = stale.len(), "serving stale snapshot");
                        Ok(stale)
                    }
                    None => Err(e),
                }
            }
        }
    }

    /// Fetch the domain from the remote portal and persist the new snapshot.
    async fn refresh(&self, source: &DomainSource) -> Result<Arc<Dataset>, FetchError> {
        let dataset = fetch_domain(self.portal.as_ref(), source, self.pacing).await?;

        {
            let writer = self
                .writer
                .lock()
                .map_err(|e| FetchError::Internal(format!("writer mutex poisoned: {e}")))?;
            writer.write_snapshot(&dataset, source.host, source.ttl_hours)?;
        }
        self.reader.invalidate(source.domain).await;

        info!(domain = %source.domain, rows = dataset.len(), "snapshot refreshed");
        Ok(Arc::new(dataset))
    }

    /// One pass over every configured source, refreshing whichever snapshots
    /// have expired. Failures are logged and skipped; the stale snapshot
    /// stays in place as the fallback.
    pub async fn refresh_cycle(&self) {
        for source in &self.sources {
            let valid = match self.reader.snapshot_valid(source.domain) {
                Ok(valid) => valid,
                Err(e) => {
                    warn!(domain = %source.domain, error = %e, "snapshot check failed");
                    false
                }
            };
            if valid {
                continue;
            }
            if let Err(e) = self.refresh(source).await {
                warn!(domain = %source.domain, error = %e, "refresh failed");
            }
        }
    }
}
