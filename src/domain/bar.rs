//! Feature bar: one OHLCV candle plus its derived indicator columns.
//!
//! Columns are addressed by name so that a probability model can declare the
//! features it consumes. A column is "present" only when it holds a finite value;
//! NaN and infinities produced during warm-up read as absent.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use super::ohlcv::OhlcvBar;

/// Column names produced by the feature builder.
pub mod columns {
    pub const OPEN: &str = "open";
    pub const HIGH: &str = "high";
    pub const LOW: &str = "low";
    pub const CLOSE: &str = "close";
    pub const VOLUME: &str = "volume";

    pub const EMA_20: &str = "ema_20";
    pub const EMA_50: &str = "ema_50";
    pub const EMA20: &str = "ema20";
    pub const EMA50: &str = "ema50";
    pub const EMA_FAST: &str = "ema_fast";
    pub const EMA_SLOW: &str = "ema_slow";
    pub const RSI: &str = "rsi";
    pub const ATR: &str = "atr";
    pub const RETURN: &str = "return";
    pub const VOLATILITY: &str = "volatility";
    pub const MACD: &str = "macd";
    pub const MACD_SIGNAL: &str = "macd_signal";
    pub const MACD_HIST: &str = "macd_hist";
    pub const ADX: &str = "adx";
    pub const PLUS_DI: &str = "plus_di";
    pub const MINUS_DI: &str = "minus_di";
    pub const VWAP: &str = "vwap";
    pub const BB_MID: &str = "bb_mid";
    pub const BB_UP: &str = "bb_up";
    pub const BB_LOW: &str = "bb_low";
    pub const VOL_MA20: &str = "vol_ma20";
    pub const VOL_RATIO: &str = "vol_ratio";

    pub const REQUIRED: [&str; 5] = [OPEN, HIGH, LOW, CLOSE, VOLUME];
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    indicators: BTreeMap<String, f64>,
}

impl Bar {
    pub fn new(
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            indicators: BTreeMap::new(),
        }
    }

    pub fn from_ohlcv(bar: &OhlcvBar) -> Self {
        Bar::new(
            bar.timestamp,
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume,
        )
    }

    /// Builder-style indicator assignment.
    pub fn with(mut self, column: &str, value: f64) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: &str, value: f64) {
        match column {
            columns::OPEN => self.open = value,
            columns::HIGH => self.high = value,
            columns::LOW => self.low = value,
            columns::CLOSE => self.close = value,
            columns::VOLUME => self.volume = value,
            _ => {
                self.indicators.insert(column.to_string(), value);
            }
        }
    }

    pub fn remove(&mut self, column: &str) {
        self.indicators.remove(column);
    }

    pub fn without(mut self, column: &str) -> Self {
        self.remove(column);
        self
    }

    /// Finite value of `column`, or `None` when absent.
    pub fn value(&self, column: &str) -> Option<f64> {
        let raw = match column {
            columns::OPEN => self.open,
            columns::HIGH => self.high,
            columns::LOW => self.low,
            columns::CLOSE => self.close,
            columns::VOLUME => self.volume,
            _ => *self.indicators.get(column)?,
        };
        raw.is_finite().then_some(raw)
    }

    pub fn has(&self, column: &str) -> bool {
        self.value(column).is_some()
    }

    /// First present column among `names`.
    pub fn first_of(&self, names: &[&str]) -> Option<f64> {
        names.iter().find_map(|name| self.value(name))
    }

    /// Names of every present column, OHLCV first.
    pub fn columns(&self) -> Vec<&str> {
        let mut names: Vec<&str> = columns::REQUIRED
            .iter()
            .copied()
            .filter(|c| self.has(c))
            .collect();
        names.extend(
            self.indicators
                .iter()
                .filter(|(_, v)| v.is_finite())
                .map(|(k, _)| k.as_str()),
        );
        names
    }
}
