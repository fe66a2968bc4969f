use dotenv::dotenv;
use ohlc_feed::{Config, OhlcFeedService};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(Config::from_env()?);
    info!("Writing time series to {}", config.data_dir.display());

    let service = Arc::new(OhlcFeedService::new(config)?);

    tokio::select! {
        _ = service.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, stopping OHLC feed");
        }
    }

    Ok(())
}
