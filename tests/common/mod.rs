#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use sigtrader::domain::bar::{columns, Bar};
use sigtrader::domain::error::{ModelError, TraderError};
pub use sigtrader::domain::ohlcv::OhlcvBar;
use sigtrader::domain::model::{FeatureRow, ProbabilityModel};
use sigtrader::ports::data_port::DataPort;
use std::collections::HashMap;

/// Column the scripted model reads its probability from.
pub const SCRIPT: &str = "script_p";

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(&self, symbol: &str, timeframe: &str) -> Result<Vec<OhlcvBar>, TraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(TraderError::Data {
                reason: reason.clone(),
            });
        }
        match self.data.get(symbol) {
            Some(bars) if !bars.is_empty() => Ok(bars.clone()),
            _ => Err(TraderError::NoData {
                symbol: symbol.to_string(),
                timeframe: timeframe.to_string(),
            }),
        }
    }

    fn list_symbols(&self, _timeframe: &str) -> Result<Vec<String>, TraderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn ts(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + Duration::hours(i as i64)
}

pub fn make_ohlcv(i: usize, close: f64) -> OhlcvBar {
    OhlcvBar {
        timestamp: ts(i),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000.0 + i as f64,
    }
}

/// Zig-zag around a gentle drift; enough bars for every indicator to warm up.
pub fn wavy_ohlcv(len: usize) -> Vec<OhlcvBar> {
    (0..len)
        .map(|i| {
            let wave = if i % 4 < 2 { 1.5 } else { -1.5 };
            make_ohlcv(i, 100.0 + i as f64 * 0.05 + wave)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tilt {
    Bullish,
    Bearish,
    Neutral,
}

/// Bar with every confirmation column set so the rules read `tilt`, ATR 1
/// and a rising slow EMA.
pub fn confirmed_bar(i: usize, close: f64, tilt: Tilt, p: f64) -> Bar {
    let (ema20, ema50, rsi, hist) = match tilt {
        Tilt::Bullish => (close - 1.0, close - 2.0, 65.0, 0.5),
        Tilt::Bearish => (close + 1.0, close + 2.0, 35.0, -0.5),
        Tilt::Neutral => (close, close, 50.0, 0.0),
    };
    Bar::new(ts(i), close, close + 0.5, close - 0.5, close, 1000.0)
        .with(columns::EMA_20, ema20)
        .with(columns::EMA_50, ema50)
        .with(columns::EMA_SLOW, 90.0 + i as f64)
        .with(columns::RSI, rsi)
        .with(columns::ADX, 30.0)
        .with(columns::MACD_HIST, hist)
        .with(columns::VOL_RATIO, 1.5)
        .with(columns::ATR, 1.0)
        .with(SCRIPT, p)
}

/// `len` bars at `close`, neutral with probability 0.1.
pub fn quiet_series(len: usize, close: f64) -> Vec<Bar> {
    (0..len)
        .map(|i| confirmed_bar(i, close, Tilt::Neutral, 0.1))
        .collect()
}

/// 100 quiet bars, then one bar per `(close, tilt, p)`.
pub fn scripted_series(tail: &[(f64, Tilt, f64)]) -> Vec<Bar> {
    let mut bars = quiet_series(100, 100.0);
    for (k, (close, tilt, p)) in tail.iter().enumerate() {
        bars.push(confirmed_bar(100 + k, *close, *tilt, *p));
    }
    bars
}

/// Returns the probability stored in the [`SCRIPT`] column.
pub struct ScriptedModel {
    columns: Vec<String>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        ScriptedModel {
            columns: vec![SCRIPT.to_string()],
        }
    }
}

impl ProbabilityModel for ScriptedModel {
    fn feature_columns(&self) -> &[String] {
        &self.columns
    }

    fn predict_proba(&self, row: &FeatureRow) -> Result<f64, ModelError> {
        row.get(SCRIPT).ok_or_else(|| ModelError::MissingFeature {
            column: SCRIPT.to_string(),
        })
    }
}

pub struct FixedModel {
    pub probability: f64,
    columns: Vec<String>,
}

impl FixedModel {
    pub fn new(probability: f64) -> Self {
        FixedModel {
            probability,
            columns: vec![columns::RSI.to_string(), columns::ATR.to_string()],
        }
    }
}

impl ProbabilityModel for FixedModel {
    fn feature_columns(&self) -> &[String] {
        &self.columns
    }

    fn predict_proba(&self, _row: &FeatureRow) -> Result<f64, ModelError> {
        Ok(self.probability)
    }
}

/// Panics once the close crosses `limit`.
pub struct PanicAbove {
    pub limit: f64,
    columns: Vec<String>,
}

impl PanicAbove {
    pub fn new(limit: f64) -> Self {
        PanicAbove {
            limit,
            columns: vec![columns::CLOSE.to_string()],
        }
    }
}

impl ProbabilityModel for PanicAbove {
    fn feature_columns(&self) -> &[String] {
        &self.columns
    }

    fn predict_proba(&self, row: &FeatureRow) -> Result<f64, ModelError> {
        match row.get(columns::CLOSE) {
            Some(close) if close > self.limit => panic!("close {close} above limit"),
            _ => Ok(0.1),
        }
    }
}

pub const MODEL_INI: &str = r#"
[model]
features = rsi, vol_ratio, macd_hist
weights = 0.05, 1.0, 0.5
intercept = -3.0
"#;
