use ohlc_feed::{Interval, TimeSeries};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct SeriesResponse {
    pub symbol: String,
    pub interval: Interval,
    pub data: TimeSeries,
}

#[derive(Debug, Deserialize)]
pub struct OverviewQuery {
    pub investment: Option<f64>,
    /// Maker fee in percent, e.g. `0.1` for 0.1%.
    pub fee: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct OverviewRow {
    pub symbol: String,
    /// `None` while the symbol has no stored data.
    pub end_value: Option<f64>,
    pub change: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    pub mode: String,
    pub interval: Interval,
    pub investment: f64,
    pub fee: f64,
    pub rows: Vec<OverviewRow>,
}
