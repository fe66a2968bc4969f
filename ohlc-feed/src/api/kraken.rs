use crate::config::Config;
use crate::error::{FeedError, Result};
use crate::models::{Interval, OhlcResponse, TimeSeries};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Fetches a URL and hands back the raw body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<String>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FeedError::HttpStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}

#[derive(Clone)]
pub struct KrakenClient {
    transport: Arc<dyn Transport>,
    config: Arc<Config>,
}

impl KrakenClient {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: Arc<Config>, transport: Arc<dyn Transport>) -> Self {
        Self { transport, config }
    }

    /// Fetch the OHLC history Kraken currently serves for `symbol`, reduced
    /// to open price by candle time.
    pub async fn fetch_candles(&self, symbol: &str, interval: Interval) -> Result<TimeSeries> {
        let pair = self
            .config
            .pair_for(symbol)
            .ok_or_else(|| FeedError::Mapping {
                symbol: symbol.to_string(),
            })?;

        let url = format!(
            "{}/0/public/OHLC?pair={}&interval={}",
            self.config.kraken_base_url.trim_end_matches('/'),
            pair,
            interval
        );

        debug!("Fetching {} OHLC ({}m) from Kraken: {}", symbol, interval, url);

        let text = self.transport.get(&url).await?;
        let response: OhlcResponse = match serde_json::from_str(&text) {
            Ok(response) => response,
            Err(e) => {
                error!("Kraken raw response: {}", text);
                return Err(FeedError::Parse(e));
            }
        };

        let series = normalize(pair, &response)?;
        info!(
            "[KRAKEN] {} {}m: {} candles (last={:?})",
            symbol,
            interval,
            series.len(),
            response.last()
        );
        Ok(series)
    }
}

/// Turn the candle rows under `pair` into a [`TimeSeries`].
pub fn normalize(pair: &str, response: &OhlcResponse) -> Result<TimeSeries> {
    if !response.error.is_empty() {
        return Err(FeedError::Api(response.error.join(", ")));
    }

    let rows = response
        .result
        .as_ref()
        .and_then(|result| result.get(pair))
        .and_then(Value::as_array)
        .ok_or_else(|| FeedError::EmptyResult {
            pair: pair.to_string(),
        })?;

    let series = rows.iter().map(parse_row).collect::<Result<TimeSeries>>()?;
    if series.is_empty() {
        return Err(FeedError::EmptyResult {
            pair: pair.to_string(),
        });
    }
    Ok(series)
}

fn parse_row(row: &Value) -> Result<(i64, f64)> {
    let fields = row.as_array().ok_or_else(|| FeedError::InvalidCandle {
        message: format!("candle is not an array: {}", row),
    })?;

    let timestamp = fields
        .first()
        .and_then(as_timestamp)
        .ok_or_else(|| FeedError::InvalidCandle {
            message: format!("missing or invalid time in {}", row),
        })?;

    let open = fields
        .get(1)
        .and_then(as_price)
        .ok_or_else(|| FeedError::InvalidCandle {
            message: format!("missing or invalid open price in {}", row),
        })?;

    Ok((timestamp, open))
}

fn as_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Non-finite prices are rejected: they would serialize as `null` and make
/// the data file unreadable.
fn as_price(value: &Value) -> Option<f64> {
    let price = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    };
    price.filter(|p| p.is_finite())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records requested URLs and replays a canned body (or failure).
    #[derive(Default)]
    pub(crate) struct SpyTransport {
        pub calls: Mutex<Vec<String>>,
        bodies: Mutex<Vec<std::result::Result<String, String>>>,
    }

    impl SpyTransport {
        pub fn replying(body: &str) -> Self {
            let spy = Self::default();
            spy.push_ok(body);
            spy
        }

        pub fn push_ok(&self, body: &str) {
            self.bodies.lock().unwrap().push(Ok(body.to_string()));
        }

        pub fn push_err(&self, message: &str) {
            self.bodies.lock().unwrap().push(Err(message.to_string()));
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for SpyTransport {
        async fn get(&self, url: &str) -> Result<String> {
            self.calls.lock().unwrap().push(url.to_string());
            let mut bodies = self.bodies.lock().unwrap();
            let next = if bodies.len() > 1 {
                bodies.remove(0)
            } else {
                bodies.first().cloned().unwrap_or_else(|| Err("no body".to_string()))
            };
            next.map_err(|message| FeedError::HttpStatus {
                status: 503,
                url: format!("{} ({})", url, message),
            })
        }
    }

    fn client(spy: Arc<SpyTransport>) -> KrakenClient {
        let config = Config {
            kraken_base_url: "https://kraken.test/".to_string(),
            ..Config::default()
        };
        KrakenClient::with_transport(Arc::new(config), spy)
    }

    const BTC_BODY: &str = r#"{
        "error": [],
        "result": {
            "XXBTZUSD": [
                [1000, "50000.1", "50010.0", "49990.0", "50005.0", "50001.0", "1.5", 12],
                [1300, "50100.5", "50110.0", "50090.0", "50105.0", "50101.0", "2.5", 20]
            ],
            "last": 1300
        }
    }"#;

    #[tokio::test]
    async fn fetch_candles_keeps_time_and_open() {
        let spy = Arc::new(SpyTransport::replying(BTC_BODY));
        let series = client(spy.clone())
            .fetch_candles("BTC", Interval::FIFTEEN_MINUTES)
            .await
            .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.get(1000), Some(50000.1));
        assert_eq!(series.get(1300), Some(50100.5));
        assert_eq!(
            spy.calls.lock().unwrap().as_slice(),
            ["https://kraken.test/0/public/OHLC?pair=XXBTZUSD&interval=15"]
        );
    }

    #[tokio::test]
    async fn unmapped_symbol_never_hits_the_network() {
        let spy = Arc::new(SpyTransport::replying(BTC_BODY));
        let err = client(spy.clone())
            .fetch_candles("PEPE", Interval::FIVE_MINUTES)
            .await
            .unwrap_err();

        assert!(matches!(err, FeedError::Mapping { ref symbol } if symbol == "PEPE"));
        assert_eq!(spy.call_count(), 0);
    }

    #[tokio::test]
    async fn api_errors_are_joined() {
        let body = r#"{"error": ["EQuery:Unknown asset pair", "EGeneral:Invalid arguments"]}"#;
        let spy = Arc::new(SpyTransport::replying(body));
        let err = client(spy)
            .fetch_candles("BTC", Interval::FIVE_MINUTES)
            .await
            .unwrap_err();

        match err {
            FeedError::Api(message) => assert_eq!(
                message,
                "EQuery:Unknown asset pair, EGeneral:Invalid arguments"
            ),
            other => panic!("expected api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_pair_key_is_empty_result() {
        let body = r#"{"error": [], "result": {"XETHZUSD": [], "last": 0}}"#;
        let spy = Arc::new(SpyTransport::replying(body));
        let err = client(spy)
            .fetch_candles("BTC", Interval::FIVE_MINUTES)
            .await
            .unwrap_err();

        assert!(matches!(err, FeedError::EmptyResult { ref pair } if pair == "XXBTZUSD"));
    }

    #[tokio::test]
    async fn invalid_json_is_parse_error() {
        let spy = Arc::new(SpyTransport::replying("<html>502 Bad Gateway</html>"));
        let err = client(spy)
            .fetch_candles("BTC", Interval::FIVE_MINUTES)
            .await
            .unwrap_err();

        assert!(matches!(err, FeedError::Parse(_)));
    }

    #[tokio::test]
    async fn http_status_failures_pass_through() {
        let spy = Arc::new(SpyTransport::default());
        spy.push_err("connection refused");
        let err = client(spy)
            .fetch_candles("BTC", Interval::FIVE_MINUTES)
            .await
            .unwrap_err();

        assert!(matches!(err, FeedError::HttpStatus { status: 503, .. }));
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let config = Config {
            kraken_base_url: "http://127.0.0.1:1".to_string(),
            request_timeout: std::time::Duration::from_secs(5),
            ..Config::default()
        };
        let err = KrakenClient::new(Arc::new(config))
            .unwrap()
            .fetch_candles("BTC", Interval::FIVE_MINUTES)
            .await
            .unwrap_err();

        assert!(matches!(err, FeedError::Transport(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn empty_candle_array_is_empty_result() {
        let body = r#"{"error": [], "result": {"XXBTZUSD": [], "last": 0}}"#;
        let spy = Arc::new(SpyTransport::replying(body));
        let err = client(spy)
            .fetch_candles("BTC", Interval::FIVE_MINUTES)
            .await
            .unwrap_err();

        assert!(matches!(err, FeedError::EmptyResult { .. }));
    }

    #[test]
    fn non_finite_open_prices_are_rejected() {
        for open in [r#""NaN""#, r#""inf""#, r#""-infinity""#] {
            let body = format!(
                r#"{{"error": [], "result": {{"XXBTZUSD": [[60, {}]]}}}}"#,
                open
            );
            let response: OhlcResponse = serde_json::from_str(&body).unwrap();

            assert!(
                matches!(
                    normalize("XXBTZUSD", &response),
                    Err(FeedError::InvalidCandle { .. })
                ),
                "open price {} was accepted",
                open
            );
        }
    }

    #[test]
    fn numeric_open_prices_are_accepted() {
        let response: OhlcResponse = serde_json::from_str(
            r#"{"error": [], "result": {"SOLUSD": [[60, 21.5, "22"], [120, "21.75", "22"]]}}"#,
        )
        .unwrap();

        let series = normalize("SOLUSD", &response).unwrap();
        assert_eq!(series.first(), Some(21.5));
        assert_eq!(series.last(), Some(21.75));
    }

    #[test]
    fn garbage_open_price_is_rejected() {
        let response: OhlcResponse =
            serde_json::from_str(r#"{"error": [], "result": {"SOLUSD": [[60, "abc"]]}}"#)
                .unwrap();

        assert!(matches!(
            normalize("SOLUSD", &response),
            Err(FeedError::InvalidCandle { .. })
        ));
    }
}
