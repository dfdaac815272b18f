//! CSV import provider.
//!
//! Reads bars from `<dir>/<SYMBOL>_<timeframe>.csv`, e.g. `EURUSD_1h.csv`,
//! with a header row `timestamp,open,high,low,close[,volume]` and RFC 3339
//! timestamps. Files are treated as fully closed history: no `as_of` is set.

use super::provider::{BarProvider, DataError};
use crate::domain::{Bar, BarSeries, Timeframe};
use crate::reference::normalize_symbol;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.dir
            .join(format!("{}_{}.csv", normalize_symbol(symbol), timeframe.label()))
    }

    /// Read every bar in a CSV file, oldest first.
    pub fn read_file(path: &Path) -> Result<Vec<Bar>, DataError> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut bars = Vec::new();
        for record in reader.deserialize() {
            let bar: Bar = record?;
            bars.push(bar);
        }
        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}

impl BarProvider for CsvProvider {
    fn name(&self) -> &str {
        "CSV"
    }

    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<BarSeries, DataError> {
        let path = self.path_for(symbol, timeframe);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: format!("{symbol} ({})", path.display()),
            });
        }

        let mut bars = Self::read_file(&path)?;
        if bars.len() > count {
            bars.drain(..bars.len() - count);
        }
        debug!(path = %path.display(), bars = bars.len(), "loaded bars from CSV");
        Ok(BarSeries::new(normalize_symbol(symbol), timeframe, bars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!("fxsize_csv_test_{}_{id}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    const SAMPLE: &str = "\
timestamp,open,high,low,close,volume
2024-01-02T02:00:00Z,1.1020,1.1040,1.1010,1.1030,500
2024-01-02T00:00:00Z,1.1000,1.1015,1.0990,1.1010,400
2024-01-02T01:00:00Z,1.1010,1.1030,1.1000,1.1020,450
";

    #[test]
    fn reads_and_sorts() {
        let dir = temp_dir();
        std::fs::write(dir.join("EURUSD_1h.csv"), SAMPLE).unwrap();

        let provider = CsvProvider::new(&dir);
        let series = provider.fetch_bars("eur/usd", Timeframe::H1, 10).unwrap();
        assert_eq!(series.symbol, "EURUSD");
        assert_eq!(series.len(), 3);
        assert!(series.bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert!(series.as_of.is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn keeps_most_recent_count() {
        let dir = temp_dir();
        std::fs::write(dir.join("EURUSD_1h.csv"), SAMPLE).unwrap();

        let series = CsvProvider::new(&dir)
            .fetch_bars("EURUSD", Timeframe::H1, 2)
            .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars[1].close, 1.1030);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn volume_column_is_optional() {
        let dir = temp_dir();
        std::fs::write(
            dir.join("USDJPY_1d.csv"),
            "timestamp,open,high,low,close\n2024-01-02T00:00:00Z,141.0,142.1,140.5,141.8\n",
        )
        .unwrap();

        let series = CsvProvider::new(&dir)
            .fetch_bars("USDJPY", Timeframe::D1, 5)
            .unwrap();
        assert_eq!(series.bars[0].volume, 0.0);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_symbol_not_found() {
        let dir = temp_dir();
        let err = CsvProvider::new(&dir)
            .fetch_bars("GBPUSD", Timeframe::H4, 5)
            .unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { .. }));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn malformed_row_is_csv_error() {
        let dir = temp_dir();
        std::fs::write(
            dir.join("EURUSD_1d.csv"),
            "timestamp,open,high,low,close\nnot-a-date,1,2,0.5,1.5\n",
        )
        .unwrap();
        let err = CsvProvider::new(&dir)
            .fetch_bars("EURUSD", Timeframe::D1, 5)
            .unwrap_err();
        assert!(matches!(err, DataError::Csv(_)));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
