//! Periodic refresh: fetch, aggregate, record, read back, publish

use {
    super::{
        last_week::apply_last_week,
        published::{PublishedStatistics, Snapshot},
        source::SnapshotSource,
        writer::{write_timeseries, UpdatePlan, WriteReport},
    },
    crate::{
        config::HeraldConfig,
        error::{HeraldError, Result},
        models::snapshot_timestamp,
        pipeline::Statistics,
        timeseries::SeriesStore,
    },
    chrono::{DateTime, TimeDelta, Utc},
    std::{
        future::Future,
        sync::Arc,
        time::{Duration, Instant},
    },
    tokio::time::{interval, MissedTickBehavior},
};

/// Shortest period `run` ticks at
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Cadence and bounds of the refresh loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSettings {
    pub interval: Duration,
    /// How far back last-week gains reach
    pub last_week_window: TimeDelta,
    pub fetch_timeout: Duration,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30 * 60),
            last_week_window: TimeDelta::days(8),
            fetch_timeout: Duration::from_secs(60),
        }
    }
}

impl From<&HeraldConfig> for RefreshSettings {
    fn from(config: &HeraldConfig) -> Self {
        Self {
            interval: config.refresh_interval(),
            last_week_window: config.last_week_window(),
            fetch_timeout: config.fetch_timeout(),
        }
    }
}

/// What one successful cycle did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    /// Logical time of the snapshot
    pub timestamp: DateTime<Utc>,
    pub characters: usize,
    pub guilds: usize,
    pub writes: WriteReport,
    pub elapsed: Duration,
}

/// Owns the refresh cadence and the published snapshot
pub struct RefreshOrchestrator {
    source: Arc<dyn SnapshotSource>,
    store: SeriesStore,
    published: Arc<PublishedStatistics>,
    settings: RefreshSettings,

    /// Wall clock (replaceable in tests)
    now_fn: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl RefreshOrchestrator {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        store: SeriesStore,
        settings: RefreshSettings,
    ) -> Self {
        Self::new_with_clock(source, store, settings, Utc::now)
    }

    /// Create an orchestrator with a custom wall clock
    pub fn new_with_clock<F>(
        source: Arc<dyn SnapshotSource>,
        store: SeriesStore,
        settings: RefreshSettings,
        now_fn: F,
    ) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        Self {
            source,
            store,
            published: Arc::new(PublishedStatistics::new()),
            settings,
            now_fn: Box::new(now_fn),
        }
    }

    /// Handle for readers; stays valid after `run` consumed the orchestrator
    pub fn published(&self) -> Arc<PublishedStatistics> {
        Arc::clone(&self.published)
    }

    pub fn store(&self) -> &SeriesStore {
        &self.store
    }

    /// Run one full cycle and publish its result
    ///
    /// On error nothing is published and the previous snapshot stays current.
    /// Series writes that already happened are kept.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let started = Instant::now();
        let timeout = self.settings.fetch_timeout;

        log::info!("🔄 Fetching snapshot from {}", self.source.describe());
        let snapshot = tokio::time::timeout(timeout, self.source.fetch())
            .await
            .map_err(|_| HeraldError::FetchTimeout(timeout))??;

        let now = (self.now_fn)();
        let timestamp = snapshot_timestamp(snapshot.values(), now);
        log::info!("   ├─ {} characters, snapshot time {}", snapshot.len(), timestamp);

        let stats = Statistics::from_snapshot(snapshot, timestamp);

        let plan = UpdatePlan::from_statistics(&stats, timestamp);
        log::info!("   ├─ Writing {} series", plan.len());
        let writes = write_timeseries(&self.store, plan).await;
        if writes.failed > 0 {
            log::warn!("⚠️  {} series writes failed this cycle", writes.failed);
        }

        let store = self.store.clone();
        let since = now
            .checked_sub_signed(self.settings.last_week_window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let stats = tokio::task::spawn_blocking(move || {
            let mut stats = stats;
            apply_last_week(&mut stats, &store, since);
            stats
        })
        .await?;

        let report = CycleReport {
            timestamp,
            characters: stats.characters.len(),
            guilds: stats.top_rp_guilds.len(),
            writes,
            elapsed: started.elapsed(),
        };

        self.published.publish(Snapshot::new(stats, now));
        Ok(report)
    }

    /// Refresh immediately, then on every tick until `shutdown` resolves
    ///
    /// The interval is raised to `MIN_INTERVAL` if shorter.
    ///
    /// Cycles never overlap: a tick that comes due while a cycle is running is
    /// skipped. `shutdown` is only looked at between cycles, so a cycle that has
    /// started always finishes its writes.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future + Send,
    {
        log::info!(
            "⏰ Starting refresh loop (interval: {:?}, last-week window: {} days)",
            self.settings.interval,
            self.settings.last_week_window.num_days()
        );

        // a zero period would make `interval` panic
        let mut timer = interval(self.settings.interval.max(MIN_INTERVAL));
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    log::info!("⚠️  Shutdown requested, stopping refresh loop");
                    break;
                }
                _ = timer.tick() => {
                    match self.run_cycle().await {
                        Ok(report) => log::info!(
                            "✅ Refresh done: {} chars, {} guilds, {} written, {} same ({:?})",
                            report.characters,
                            report.guilds,
                            report.writes.written,
                            report.writes.unchanged,
                            report.elapsed
                        ),
                        Err(e) => {
                            log::warn!("⚠️  Refresh failed, keeping previous statistics: {}", e)
                        }
                    }
                }
            }
        }
    }
}
