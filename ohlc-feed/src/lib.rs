pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod ohlc_feed;
pub mod store;

pub use config::Config;
pub use error::{FeedError, Result, StoreError};
pub use models::{Interval, TimeSeries};
pub use ohlc_feed::{CycleReport, OhlcFeedService};
pub use store::TimeSeriesStore;
