//! Market regime classification from EMA slope and relative volatility.
//!
//! slope        = mean of the last 5 first-differences of `ema_slow`
//! atr_relative = mean of the last 5 values of `atr / close`
//!
//! atr_relative > 0.06  → Chaotic
//! |slope| > 0.0005     → Trending
//! otherwise            → Ranging
//!
//! Classification never fails: short windows and windows without usable
//! readings degrade to [`Regime::Ranging`].

use std::fmt;

use super::bar::{columns, Bar};

pub const LOOKBACK: usize = 5;
pub const CHAOTIC_ATR_RELATIVE: f64 = 0.06;
pub const TRENDING_SLOPE: f64 = 0.0005;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Regime {
    Trending,
    Ranging,
    Chaotic,
}

impl Regime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::Trending => "trending",
            Regime::Ranging => "ranging",
            Regime::Chaotic => "chaotic",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw inputs of the classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeReading {
    pub slope: f64,
    pub atr_relative: f64,
}

impl RegimeReading {
    pub fn regime(&self) -> Regime {
        if self.atr_relative > CHAOTIC_ATR_RELATIVE {
            Regime::Chaotic
        } else if self.slope.abs() > TRENDING_SLOPE {
            Regime::Trending
        } else {
            Regime::Ranging
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Slope and relative ATR over the trailing rows, or `None` when fewer than
/// [`LOOKBACK`] rows are available or neither reading can be formed.
pub fn read_regime(window: &[Bar]) -> Option<RegimeReading> {
    if window.len() < LOOKBACK {
        return None;
    }

    // last LOOKBACK differences need LOOKBACK + 1 rows when available
    let start = window.len().saturating_sub(LOOKBACK + 1);
    let tail = &window[start..];

    let diffs: Vec<f64> = tail
        .windows(2)
        .filter_map(|w| Some(w[1].value(columns::EMA_SLOW)? - w[0].value(columns::EMA_SLOW)?))
        .collect();

    let relative_atr: Vec<f64> = window[window.len() - LOOKBACK..]
        .iter()
        .filter_map(|b| {
            let close = b.value(columns::CLOSE)?;
            let atr = b.value(columns::ATR)?;
            let rel = atr / close;
            rel.is_finite().then_some(rel)
        })
        .collect();

    let slope = mean(&diffs);
    let atr_relative = mean(&relative_atr);
    if slope.is_none() && atr_relative.is_none() {
        return None;
    }

    Some(RegimeReading {
        slope: slope.unwrap_or(0.0),
        atr_relative: atr_relative.unwrap_or(0.0),
    })
}

pub fn classify_regime(window: &[Bar]) -> Regime {
    read_regime(window)
        .map(|r| r.regime())
        .unwrap_or(Regime::Ranging)
}
