use crate::error::{FeedError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Candle widths (minutes) accepted by the Kraken OHLC endpoint.
pub const SUPPORTED_INTERVALS: [u32; 9] = [1, 5, 15, 30, 60, 240, 1440, 10080, 21600];

/// Candle width in minutes. Only values from [`SUPPORTED_INTERVALS`] can be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Interval(u32);

impl Interval {
    pub const FIVE_MINUTES: Interval = Interval(5);
    pub const FIFTEEN_MINUTES: Interval = Interval(15);

    pub fn new(minutes: u32) -> Result<Self> {
        if SUPPORTED_INTERVALS.contains(&minutes) {
            Ok(Self(minutes))
        } else {
            Err(FeedError::UnsupportedInterval(minutes))
        }
    }

    pub fn minutes(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Interval {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self> {
        let minutes = s
            .trim()
            .parse::<u32>()
            .map_err(|_| FeedError::ConfigError(format!("Invalid interval: {}", s)))?;
        Self::new(minutes)
    }
}

/// Open price keyed by candle start time (unix seconds), ascending.
///
/// Serialized as a JSON object with stringified timestamp keys, which is the
/// on-disk format of the data files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeSeries(BTreeMap<i64, f64>);

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, timestamp: i64) -> Option<f64> {
        self.0.get(&timestamp).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Open price of the earliest candle.
    pub fn first(&self) -> Option<f64> {
        self.0.values().next().copied()
    }

    /// Open price of the latest candle.
    pub fn last(&self) -> Option<f64> {
        self.0.values().next_back().copied()
    }

    /// Union of both series; on a shared timestamp `newer` wins.
    pub fn merge(&mut self, newer: &TimeSeries) {
        self.0
            .extend(newer.0.iter().map(|(timestamp, open)| (*timestamp, *open)));
    }
}

impl FromIterator<(i64, f64)> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = (i64, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Body of `GET /0/public/OHLC`.
///
/// `result` holds one candle array under the pair key plus a numeric `last`
/// cursor, so it is kept as raw JSON and picked apart by the client.
#[derive(Debug, Deserialize)]
pub struct OhlcResponse {
    #[serde(default)]
    pub error: Vec<String>,
    #[serde(default)]
    pub result: Option<HashMap<String, Value>>,
}

impl OhlcResponse {
    pub fn last(&self) -> Option<i64> {
        self.result.as_ref()?.get("last")?.as_i64()
    }
}
