//! CSV file data adapter.
//!
//! One file per symbol and timeframe, `<symbol>_<timeframe>.csv`, with the
//! columns `timestamp,open,high,low,close,volume`. Timestamps are either
//! `YYYY-MM-DD HH:MM:SS`, ISO `YYYY-MM-DDTHH:MM:SS`, or a plain date.

use crate::domain::error::TraderError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, timeframe: &str) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", symbol, timeframe))
    }
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_field(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, TraderError> {
    record
        .get(index)
        .ok_or_else(|| TraderError::Data {
            reason: format!("missing {} column", name),
        })?
        .trim()
        .parse()
        .map_err(|e| TraderError::Data {
            reason: format!("invalid {} value: {}", name, e),
        })
}

impl DataPort for CsvAdapter {
    fn fetch_bars(&self, symbol: &str, timeframe: &str) -> Result<Vec<OhlcvBar>, TraderError> {
        let path = self.csv_path(symbol, timeframe);
        if !path.exists() {
            return Err(TraderError::NoData {
                symbol: symbol.to_string(),
                timeframe: timeframe.to_string(),
            });
        }
        let content = fs::read_to_string(&path).map_err(|e| TraderError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| TraderError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let raw = record.get(0).ok_or_else(|| TraderError::Data {
                reason: "missing timestamp column".into(),
            })?;
            let timestamp = parse_timestamp(raw).ok_or_else(|| TraderError::Data {
                reason: format!("invalid timestamp: {}", raw),
            })?;

            bars.push(OhlcvBar {
                timestamp,
                open: parse_field(&record, 1, "open")?,
                high: parse_field(&record, 2, "high")?,
                low: parse_field(&record, 3, "low")?,
                close: parse_field(&record, 4, "close")?,
                volume: parse_field(&record, 5, "volume")?,
            });
        }

        if bars.is_empty() {
            return Err(TraderError::NoData {
                symbol: symbol.to_string(),
                timeframe: timeframe.to_string(),
            });
        }
        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }

    fn list_symbols(&self, timeframe: &str) -> Result<Vec<String>, TraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| TraderError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let suffix = format!("_{}.csv", timeframe);
        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| TraderError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(symbol) = name_str.strip_suffix(&suffix) {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "timestamp,open,high,low,close,volume\n\
            2024-01-15 02:00:00,105.0,115.0,100.0,110.0,60000\n\
            2024-01-15 01:00:00,100.0,110.0,90.0,105.0,50000.5\n\
            2024-01-15T03:00:00,110.0,120.0,105.0,115.0,55000\n";

        fs::write(path.join("BTCUSDT_1h.csv"), csv_content).unwrap();
        fs::write(
            path.join("ETHUSDT_1h.csv"),
            "timestamp,open,high,low,close,volume\n",
        )
        .unwrap();
        fs::write(
            path.join("EURUSD_1d.csv"),
            "timestamp,open,high,low,close,volume\n2024-01-15,1.0,1.1,0.9,1.05,100\n",
        )
        .unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_bars_returns_sorted_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_bars("BTCUSDT", "1h").unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].timestamp, parse_timestamp("2024-01-15 01:00:00").unwrap());
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 110.0);
        assert_eq!(bars[0].low, 90.0);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].volume, 50000.5);
        assert_eq!(bars[2].close, 115.0);
    }

    #[test]
    fn fetch_bars_accepts_plain_dates() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_bars("EURUSD", "1d").unwrap();
        assert_eq!(
            bars[0].timestamp,
            NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn fetch_bars_reports_no_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        assert!(matches!(
            adapter.fetch_bars("ETHUSDT", "1h"),
            Err(TraderError::NoData { .. })
        ));
        assert!(matches!(
            adapter.fetch_bars("XYZ", "1h"),
            Err(TraderError::NoData { .. })
        ));
    }

    #[test]
    fn fetch_bars_rejects_bad_rows() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("BAD_1h.csv"),
            "timestamp,open,high,low,close,volume\nyesterday,1,2,0.5,1.5,10\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("NUM_1h.csv"),
            "timestamp,open,high,low,close,volume\n2024-01-01,1,2,0.5,abc,10\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());

        assert!(matches!(adapter.fetch_bars("BAD", "1h"), Err(TraderError::Data { .. })));
        assert!(matches!(adapter.fetch_bars("NUM", "1h"), Err(TraderError::Data { .. })));
    }

    #[test]
    fn list_symbols_returns_timeframe_symbols() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let symbols = adapter.list_symbols("1h").unwrap();
        assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT"]);

        let symbols = adapter.list_symbols("1d").unwrap();
        assert_eq!(symbols, vec!["EURUSD"]);
    }
}
