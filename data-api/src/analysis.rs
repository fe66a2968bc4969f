use ohlc_feed::TimeSeries;
use std::fmt;
use std::str::FromStr;

/// Overview modes offered by the dashboard. Only holding is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisMode {
    Holding,
    Sma,
    Ema,
    Markov,
}

impl AnalysisMode {
    pub fn is_implemented(self) -> bool {
        matches!(self, AnalysisMode::Holding)
    }
}

impl FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "holding" => Ok(Self::Holding),
            "sma" => Ok(Self::Sma),
            "ema" => Ok(Self::Ema),
            "markov" | "markov's chain" => Ok(Self::Markov),
            other => Err(format!("Unknown analysis mode: {}", other)),
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Holding => "holding",
            Self::Sma => "sma",
            Self::Ema => "ema",
            Self::Markov => "markov",
        };
        f.write_str(name)
    }
}

/// Value of `investment` after buying at the first open price and selling at
/// the last, paying `fee_percent` on each leg. Rounded to cents.
pub fn holding_end_value(series: &TimeSeries, investment: f64, fee_percent: f64) -> Option<f64> {
    let first = series.first()?;
    let last = series.last()?;
    if first <= 0.0 {
        return None;
    }

    let fee = fee_percent / 100.0;
    let end_value = investment * (1.0 - fee) / first * last * (1.0 - fee);
    Some((end_value * 100.0).round() / 100.0)
}

/// Relative change of `end_value` against `investment`, to three decimals.
pub fn change_ratio(end_value: f64, investment: f64) -> Option<f64> {
    if investment == 0.0 {
        return None;
    }
    Some(((end_value / investment - 1.0) * 1000.0).round() / 1000.0)
}
