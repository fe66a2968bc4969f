use crate::error::{ApiError, Result};
use ohlc_feed::Config as FeedConfig;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub static_dir: PathBuf,
    /// Symbols, intervals and data directory shared with the feed service.
    pub feed: FeedConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ApiError::Config("Invalid PORT".to_string()))?;

        let static_dir = env::var("STATIC_DIR")
            .unwrap_or_else(|_| "./data-api/public".to_string())
            .into();

        let feed = FeedConfig::from_env().map_err(|e| ApiError::Config(e.to_string()))?;

        Ok(Self {
            port,
            static_dir,
            feed,
        })
    }
}
