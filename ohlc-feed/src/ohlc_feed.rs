use crate::api::KrakenClient;
use crate::config::Config;
use crate::error::Result;
use crate::models::Interval;
use crate::store::TimeSeriesStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info};

/// Outcome of one pass over every symbol and interval.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub succeeded: usize,
    pub failed: usize,
}

pub struct OhlcFeedService {
    kraken_client: KrakenClient,
    store: TimeSeriesStore,
    config: Arc<Config>,
}

impl OhlcFeedService {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let kraken_client = KrakenClient::new(config.clone())?;
        Ok(Self::with_client(config, kraken_client))
    }

    pub fn with_client(config: Arc<Config>, kraken_client: KrakenClient) -> Self {
        let store = TimeSeriesStore::new(config.data_dir.clone());
        Self {
            kraken_client,
            store,
            config,
        }
    }

    /// Run a cycle now, then again every cycle period. Ticks missed while a
    /// cycle overran are not replayed, so cycles never stack up.
    pub async fn run(self: Arc<Self>) {
        let period = self.config.effective_cycle_period().max(Duration::from_secs(1));
        info!("Starting OHLC feed service...");
        info!(
            "{} symbols x {} intervals, request delay {}s, cycle period {}s",
            self.config.symbols.len(),
            self.config.intervals.len(),
            self.config.request_delay.as_secs(),
            period.as_secs()
        );

        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.run_supervised_cycle().await;
        }
    }

    /// [`run_cycle`](Self::run_cycle) on its own task. A panic inside the
    /// cycle is logged and the service stays up for the next tick.
    pub async fn run_supervised_cycle(self: &Arc<Self>) -> Option<CycleReport> {
        let service = Arc::clone(self);
        match tokio::spawn(async move { service.run_cycle().await }).await {
            Ok(report) => Some(report),
            Err(e) => {
                error!("OHLC cycle aborted: {}", e);
                None
            }
        }
    }

    /// Fetch and persist every configured symbol/interval in order. Failures
    /// are logged per symbol and never stop the cycle.
    pub async fn run_cycle(&self) -> CycleReport {
        let started = Utc::now();
        let mut report = CycleReport::default();
        info!("Cycle started at {}", started.to_rfc3339());

        for symbol in &self.config.symbols {
            for &interval in &self.config.intervals {
                match self.update_series(symbol, interval).await {
                    Ok(()) => report.succeeded += 1,
                    Err(e) => {
                        error!("Failed to update {} ({}m): {}", symbol, interval, e);
                        report.failed += 1;
                    }
                }
            }
            time::sleep(self.config.request_delay).await;
        }

        let elapsed = Utc::now() - started;
        info!(
            "Cycle finished in {}s: {} updated, {} failed",
            elapsed.num_seconds(),
            report.succeeded,
            report.failed
        );
        report
    }

    async fn update_series(&self, symbol: &str, interval: Interval) -> Result<()> {
        let fetched = self.kraken_client.fetch_candles(symbol, interval).await;
        // Spacing applies whether or not the request succeeded.
        time::sleep(self.config.request_delay).await;
        let series = fetched?;

        let path = self.store.path_for(symbol, interval);
        self.store.merge_and_persist(&series, &path).await?;
        info!("File update complete for {} ({}m)", symbol, interval);
        Ok(())
    }
}
