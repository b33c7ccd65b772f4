use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing;

use crate::error::FetchError;
use crate::service::DatasetService;

/// The fetcher daemon. Periodically re-checks snapshot freshness and
/// refetches whatever has expired.
pub struct Daemon {
    service: Arc<DatasetService>,
    check_interval_seconds: u64,
    cancel: CancellationToken,
}

impl Daemon {
    pub fn new(service: Arc<DatasetService>, check_interval_seconds: u64) -> Self {
        Self {
            service,
            check_interval_seconds,
            cancel: CancellationToken::new(),
        }
    }

    /// Returns a CancellationToken that can be used to trigger shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the daemon until cancelled.
    pub async fn run(&self) -> Result<(), FetchError> {
        tracing::info!("CIVIQA fetcher daemon starting");

        let mut join_set = tokio::task::JoinSet::new();

        {
            let service = self.service.clone();
            let cancel = self.cancel.clone();
            let interval = std::time::Duration::from_secs(self.check_interval_seconds);
            join_set.spawn(async move {
                refresh_loop(service, interval, cancel).await;
            });
        }

        tracing::info!("All fetcher tasks started");

        // Wait for all tasks to complete (they run until cancelled)
        while join_set.join_next().await.is_some() {}

        tracing::info!("CIVIQA fetcher daemon stopped");
        Ok(())
    }
}

/// Periodic loop: refresh expired snapshots, sleep, repeat.
async fn refresh_loop(
    service: Arc<DatasetService>,
    interval: std::time::Duration,
    cancel: CancellationToken,
) {
    // Run immediately on startup
    service.refresh_cycle().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Refresh loop shutting down");
                break;
            }
            _ = tokio::time::sleep(interval) => {
                service.refresh_cycle().await;
            }
        }
    }
}
