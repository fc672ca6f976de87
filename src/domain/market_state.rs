//! Directional market state used to gate the signal engine.
//!
//! The engine accepts any [`MarketStateDetector`]; [`TrendStateDetector`] is the
//! stock implementation built on the regime reading.

use std::fmt;

use super::bar::Bar;
use super::regime::{read_regime, Regime};

/// Relative ATR below which a market is considered dead.
pub const DEAD_ATR_RELATIVE: f64 = 0.002;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketState {
    Bull,
    Bear,
    Range,
    Dead,
}

impl MarketState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketState::Bull => "bull",
            MarketState::Bear => "bear",
            MarketState::Range => "range",
            MarketState::Dead => "dead",
        }
    }
}

impl fmt::Display for MarketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait MarketStateDetector: Send + Sync {
    /// State of the market at the last bar of `window`, or `None` when it
    /// cannot be determined.
    fn detect(&self, window: &[Bar]) -> Option<MarketState>;
}

/// Maps the regime reading onto a market state:
/// dead volatility → Dead, chaotic → undetermined, trending → Bull/Bear by
/// slope sign, ranging → Range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendStateDetector {
    dead_atr_relative: f64,
}

impl Default for TrendStateDetector {
    fn default() -> Self {
        TrendStateDetector {
            dead_atr_relative: DEAD_ATR_RELATIVE,
        }
    }
}

impl TrendStateDetector {
    pub fn new(dead_atr_relative: f64) -> Self {
        if !dead_atr_relative.is_finite() || dead_atr_relative < 0.0 {
            return TrendStateDetector::default();
        }
        TrendStateDetector { dead_atr_relative }
    }

    pub fn dead_atr_relative(&self) -> f64 {
        self.dead_atr_relative
    }
}

impl MarketStateDetector for TrendStateDetector {
    fn detect(&self, window: &[Bar]) -> Option<MarketState> {
        let reading = read_regime(window)?;
        if reading.atr_relative > 0.0 && reading.atr_relative < self.dead_atr_relative {
            return Some(MarketState::Dead);
        }
        match reading.regime() {
            Regime::Chaotic => None,
            Regime::Trending if reading.slope > 0.0 => Some(MarketState::Bull),
            Regime::Trending => Some(MarketState::Bear),
            Regime::Ranging => Some(MarketState::Range),
        }
    }
}
