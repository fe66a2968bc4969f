use crate::error::{FeedError, Result};
use crate::models::Interval;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SYMBOLS: [&str; 14] = [
    "BTC", "ETH", "XRP", "SOL", "DOGE", "ADA", "TRX", "LINK", "AVAX", "DOT", "MATIC", "UNI",
    "SHIB", "LTC",
];

/// Ticker to Kraken pair id. Kraken still uses the legacy X/Z prefixed ids
/// for its oldest markets.
pub const DEFAULT_PAIRS: [(&str, &str); 14] = [
    ("BTC", "XXBTZUSD"),
    ("ETH", "XETHZUSD"),
    ("XRP", "XXRPZUSD"),
    ("SOL", "SOLUSD"),
    ("DOGE", "XDGUSD"),
    ("ADA", "ADAUSD"),
    ("TRX", "TRXUSD"),
    ("LINK", "LINKUSD"),
    ("AVAX", "AVAXUSD"),
    ("DOT", "DOTUSD"),
    ("MATIC", "MATICUSD"),
    ("UNI", "UNIUSD"),
    ("SHIB", "SHIBUSD"),
    ("LTC", "XLTCZUSD"),
];

#[derive(Debug, Clone)]
pub struct Config {
    pub kraken_base_url: String,
    pub symbols: Vec<String>,
    pub pairs: HashMap<String, String>,
    pub intervals: Vec<Interval>,
    pub request_delay: Duration,
    /// Fixed cycle period; `None` derives it from the request budget.
    pub cycle_period: Option<Duration>,
    pub request_timeout: Duration,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let symbols = match env::var("OHLC_SYMBOLS") {
            Ok(raw) => parse_list(&raw).map(|s| s.to_uppercase()).collect(),
            Err(_) => DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
        };

        let mut pairs = default_pairs();
        if let Ok(raw) = env::var("OHLC_PAIRS") {
            for entry in parse_list(&raw) {
                let (symbol, pair) = entry.split_once('=').ok_or_else(|| {
                    FeedError::ConfigError(format!("Invalid OHLC_PAIRS entry: {}", entry))
                })?;
                pairs.insert(symbol.trim().to_uppercase(), pair.trim().to_string());
            }
        }

        let intervals = env::var("OHLC_INTERVALS")
            .unwrap_or_else(|_| "5,15".to_string())
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<Interval>)
            .collect::<Result<Vec<_>>>()?;

        let request_delay = Duration::from_secs(parse_secs("OHLC_REQUEST_DELAY_SECS", 60)?);
        let request_timeout = Duration::from_secs(parse_secs("OHLC_REQUEST_TIMEOUT_SECS", 30)?);
        let cycle_period = match env::var("OHLC_CYCLE_PERIOD_SECS") {
            Ok(_) => Some(Duration::from_secs(parse_secs("OHLC_CYCLE_PERIOD_SECS", 0)?)),
            Err(_) => None,
        };

        let config = Self {
            kraken_base_url: env::var("KRAKEN_BASE_URL")
                .unwrap_or_else(|_| "https://api.kraken.com".to_string()),
            symbols,
            pairs,
            intervals,
            request_delay,
            cycle_period,
            request_timeout,
            data_dir: env::var("OHLC_DATA_DIR")
                .unwrap_or_else(|_| "./data".to_string())
                .into(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Every configured symbol needs exactly one pair id, and there must be
    /// something to fetch.
    pub fn validate(&self) -> Result<()> {
        if self.symbols.is_empty() {
            return Err(FeedError::ConfigError("No symbols configured".to_string()));
        }
        if self.intervals.is_empty() {
            return Err(FeedError::ConfigError("No intervals configured".to_string()));
        }
        if let Some(symbol) = self.symbols.iter().find(|s| !self.pairs.contains_key(*s)) {
            return Err(FeedError::Mapping {
                symbol: symbol.clone(),
            });
        }
        Ok(())
    }

    pub fn pair_for(&self, symbol: &str) -> Option<&str> {
        self.pairs.get(symbol).map(String::as_str)
    }

    /// Case-insensitive lookup of a configured symbol.
    pub fn find_symbol(&self, symbol: &str) -> Option<&str> {
        self.symbols
            .iter()
            .find(|s| s.eq_ignore_ascii_case(symbol))
            .map(String::as_str)
    }

    pub fn find_interval(&self, minutes: u32) -> Option<Interval> {
        self.intervals
            .iter()
            .copied()
            .find(|i| i.minutes() == minutes)
    }

    /// Time one cycle spends sleeping: one delay after every fetch plus one
    /// after each symbol.
    pub fn cycle_budget(&self) -> Duration {
        let sleeps = self.symbols.len() * (self.intervals.len() + 1);
        self.request_delay * sleeps as u32
    }

    pub fn effective_cycle_period(&self) -> Duration {
        self.cycle_period.unwrap_or_else(|| self.cycle_budget())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kraken_base_url: "https://api.kraken.com".to_string(),
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            pairs: default_pairs(),
            intervals: vec![Interval::FIVE_MINUTES, Interval::FIFTEEN_MINUTES],
            request_delay: Duration::from_secs(60),
            cycle_period: None,
            request_timeout: Duration::from_secs(30),
            data_dir: PathBuf::from("./data"),
        }
    }
}

fn default_pairs() -> HashMap<String, String> {
    DEFAULT_PAIRS
        .iter()
        .map(|(symbol, pair)| (symbol.to_string(), pair.to_string()))
        .collect()
}

fn parse_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_secs(var: &str, default: u64) -> Result<u64> {
    env::var(var)
        .unwrap_or_else(|_| default.to_string())
        .parse::<u64>()
        .map_err(|_| FeedError::ConfigError(format!("Invalid {}", var)))
}
