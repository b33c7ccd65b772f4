use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use civiqa_cache::{CacheReader, SqliteReader};
use civiqa_fetcher::client::SocrataClient;
use civiqa_fetcher::config::FetcherConfig;
use civiqa_fetcher::daemon::Daemon;
use civiqa_fetcher::service::DatasetService;
use civiqa_fetcher::store::SqliteWriter;

#[derive(Parser, Debug)]
#[command(
    name = "civiqa-fetcher",
    about = "CIVIQA snapshot fetcher daemon - keeps the shared SQLite cache populated from the civic open-data portals"
)]
struct Cli {
    /// Path to fetcher configuration file
    #[arg(short, long, default_value = "config/civiqa-fetcher.toml")]
    config: String,

    /// Refresh expired snapshots once and exit instead of running the daemon
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("Failed to read config: {}", cli.config))?;
    let config: FetcherConfig =
        toml::from_str(&config_str).with_context(|| "Failed to parse fetcher config")?;

    let sources = config.domains.resolved_sources()?;

    // Writer opens first so the schema exists before the read-only side attaches.
    let writer = SqliteWriter::open(&config.cache.sqlite_path)
        .with_context(|| format!("Failed to open cache DB: {}", config.cache.sqlite_path))?;
    let reader = CacheReader::new(
        SqliteReader::open(&config.cache.sqlite_path)
            .with_context(|| format!("Failed to open cache DB read side: {}", config.cache.sqlite_path))?,
        16,
        Duration::from_secs(60),
    );

    let portal = SocrataClient::new().context("Failed to build HTTP client")?;
    let service = Arc::new(DatasetService::new(
        Arc::new(portal),
        Arc::new(reader),
        Arc::new(Mutex::new(writer)),
        sources,
        Duration::from_millis(config.refresh.request_pacing_ms),
    ));

    if cli.once {
        service.refresh_cycle().await;
        return Ok(());
    }

    let daemon = Daemon::new(service, config.refresh.check_interval_seconds);
    let cancel = daemon.cancel_token();

    // Handle shutdown signals
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Received shutdown signal");
        cancel.cancel();
    });

    daemon
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Daemon error: {e}"))?;

    Ok(())
}
