//! Herald refresher
//!
//! Pulls the herald dump on a fixed cadence, records every counter in the
//! series store and keeps the latest statistics published.
//!
//! Usage:
//!   cargo run --release --bin herald
//!
//! Environment variables:
//!   HERALD_DUMP_URL - dump endpoint (default: https://www2.uthgard.net/herald/api/dump)
//!   HERALD_DUMP_FILE - read a local dump instead of the endpoint
//!   HERALD_DATA_DIR - series root (default: data)
//!   HERALD_REFRESH_INTERVAL_SECS - seconds between cycles (default: 1800)
//!   HERALD_LAST_WEEK_DAYS - last-week window in days (default: 8)
//!   HERALD_FETCH_TIMEOUT_SECS - fetch bound in seconds (default: 60)

use dotenv::dotenv;
use herald::{
    refresh::{FileDumpSource, HttpDumpSource, RefreshOrchestrator, RefreshSettings, SnapshotSource},
    HeraldConfig, SeriesStore,
};
use log::{error, info};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = HeraldConfig::from_env();

    info!("🚀 Herald refresher");
    info!("   ├─ Data dir: {}", config.data_dir.display());
    info!("   ├─ Refresh interval: {}s", config.refresh_interval_secs);
    info!("   ├─ Last-week window: {} days", config.last_week_days);
    info!("   └─ Fetch timeout: {}s", config.fetch_timeout_secs);

    let source: Arc<dyn SnapshotSource> = match &config.dump_file {
        Some(path) => Arc::new(FileDumpSource::new(path)),
        None => Arc::new(HttpDumpSource::new(&config.dump_url, config.fetch_timeout())?),
    };
    info!("📡 Snapshot source: {}", source.describe());

    let orchestrator = RefreshOrchestrator::new(
        source,
        SeriesStore::new(&config.data_dir),
        RefreshSettings::from(&config),
    );
    let published = orchestrator.published();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let refresher = tokio::spawn(orchestrator.run(shutdown_rx));

    info!("🔄 Press CTRL+C to shutdown gracefully");

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("⚠️  Received CTRL+C, shutting down after the current cycle..."),
        Err(err) => error!("❌ Failed to listen for CTRL+C: {}", err),
    }

    let _ = shutdown_tx.send(());
    refresher.await?;

    match published.load() {
        Some(snapshot) => info!(
            "✅ Herald stopped (last snapshot: {} characters at {})",
            snapshot.statistics.characters.len(),
            snapshot.statistics.timestamp
        ),
        None => info!("✅ Herald stopped (no snapshot was published)"),
    }
    Ok(())
}
