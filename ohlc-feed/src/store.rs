use crate::error::StoreError;
use crate::models::{Interval, TimeSeries};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

type Result<T> = std::result::Result<T, StoreError>;

/// What a merge did to the file on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub total: usize,
    pub added: usize,
    /// The previous file could not be parsed and was replaced.
    pub recovered_corrupt: bool,
}

/// One JSON file of open prices per (symbol, interval) under `data_dir`.
#[derive(Debug, Clone)]
pub struct TimeSeriesStore {
    data_dir: PathBuf,
}

impl TimeSeriesStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// `<data_dir>/btc15.json` style path.
    pub fn path_for(&self, symbol: &str, interval: Interval) -> PathBuf {
        self.data_dir
            .join(format!("{}{}.json", symbol.to_lowercase(), interval))
    }

    /// Read a stored series. A missing file is `Ok(None)`; an unparseable one
    /// is [`StoreError::Corrupt`].
    pub async fn load(&self, path: &Path) -> Result<Option<TimeSeries>> {
        let text = match fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                path: path.to_path_buf(),
                source: e,
            })
    }

    /// Union `series` into the file at `path` (new values win) and rewrite it.
    ///
    /// A corrupt file is logged and treated as empty so that ingestion keeps
    /// going; its old content is lost.
    pub async fn merge_and_persist(&self, series: &TimeSeries, path: &Path) -> Result<MergeOutcome> {
        let (mut merged, recovered_corrupt) = match self.load(path).await {
            Ok(Some(existing)) => (existing, false),
            Ok(None) => {
                debug!("No existing file at {}, starting a new series", path.display());
                (TimeSeries::new(), false)
            }
            Err(StoreError::Corrupt { path, source }) => {
                warn!(
                    "Discarding unreadable time series {}: {}",
                    path.display(),
                    source
                );
                (TimeSeries::new(), true)
            }
            Err(e) => return Err(e),
        };

        let before = merged.len();
        merged.merge(series);
        self.write(&merged, path).await?;

        let outcome = MergeOutcome {
            total: merged.len(),
            added: merged.len() - before,
            recovered_corrupt,
        };
        info!(
            "Updated {}: {} points ({} new)",
            path.display(),
            outcome.total,
            outcome.added
        );
        Ok(outcome)
    }

    /// Pretty JSON written to a sibling temp file, then renamed over `path`.
    async fn write(&self, series: &TimeSeries, path: &Path) -> Result<()> {
        let io_err = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(series)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).await.map_err(io_err)?;
        fs::rename(&tmp, path).await.map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn series(points: &[(i64, f64)]) -> TimeSeries {
        points.iter().copied().collect()
    }

    async fn read_json(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).await.unwrap()).unwrap()
    }

    #[test]
    fn path_uses_lowercase_symbol_and_minutes() {
        let store = TimeSeriesStore::new("/tmp/data");
        assert_eq!(
            store.path_for("BTC", Interval::FIFTEEN_MINUTES),
            PathBuf::from("/tmp/data/btc15.json")
        );
    }

    #[tokio::test]
    async fn disjoint_merges_keep_both() {
        let dir = tempfile::tempdir().unwrap();
        let store = TimeSeriesStore::new(dir.path());
        let path = store.path_for("ETH", Interval::FIVE_MINUTES);

        store.merge_and_persist(&series(&[(1, 10.0)]), &path).await.unwrap();
        let outcome = store.merge_and_persist(&series(&[(2, 20.0)]), &path).await.unwrap();

        assert_eq!(outcome.total, 2);
        assert_eq!(outcome.added, 1);
        assert_eq!(read_json(&path).await, json!({"1": 10.0, "2": 20.0}));
    }

    #[tokio::test]
    async fn overlapping_key_takes_newest_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = TimeSeriesStore::new(dir.path());
        let path = store.path_for("ETH", Interval::FIVE_MINUTES);

        store
            .merge_and_persist(&series(&[(1, 10.0), (2, 20.0)]), &path)
            .await
            .unwrap();
        store.merge_and_persist(&series(&[(2, 25.0)]), &path).await.unwrap();

        assert_eq!(read_json(&path).await, json!({"1": 10.0, "2": 25.0}));
    }

    #[tokio::test]
    async fn missing_file_behaves_like_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = TimeSeriesStore::new(dir.path().join("nested"));
        let path = store.path_for("SOL", Interval::FIVE_MINUTES);
        let new = series(&[(5, 1.5)]);

        let outcome = store.merge_and_persist(&new, &path).await.unwrap();

        assert_eq!(
            outcome,
            MergeOutcome {
                total: 1,
                added: 1,
                recovered_corrupt: false
            }
        );
        assert_eq!(store.load(&path).await.unwrap(), Some(new));
    }

    #[tokio::test]
    async fn corrupt_file_is_replaced_by_new_series() {
        let dir = tempfile::tempdir().unwrap();
        let store = TimeSeriesStore::new(dir.path());
        let path = store.path_for("ADA", Interval::FIFTEEN_MINUTES);
        fs::write(&path, "{ \"1\": 0.5,").await.unwrap();

        assert!(matches!(
            store.load(&path).await,
            Err(StoreError::Corrupt { .. })
        ));

        let new = series(&[(2, 0.6)]);
        let outcome = store.merge_and_persist(&new, &path).await.unwrap();

        assert!(outcome.recovered_corrupt);
        assert_eq!(store.load(&path).await.unwrap(), Some(new));
    }

    #[tokio::test]
    async fn merging_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = TimeSeriesStore::new(dir.path());
        let path = store.path_for("LTC", Interval::FIVE_MINUTES);
        let new = series(&[(100, 70.25), (400, 71.0)]);

        store.merge_and_persist(&new, &path).await.unwrap();
        let once = read_json(&path).await;
        let outcome = store.merge_and_persist(&new, &path).await.unwrap();

        assert_eq!(outcome.added, 0);
        assert_eq!(read_json(&path).await, once);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
