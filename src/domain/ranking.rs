//! Candidate ranking for multi-symbol scans.
//!
//! [`rank_score`] blends recent return and EMA trend, modulated by range
//! volatility, relative volume and the market state. It reads raw OHLCV so a
//! scan can rank symbols before any feature work, and it never fails: any
//! unusable input scores 0.

use std::cmp::Ordering;

use super::indicator::calculate_ema;
use super::market_state::MarketState;
use super::ohlcv::OhlcvBar;

/// Bars needed before a symbol gets a non-zero score.
pub const MIN_RANK_BARS: usize = 30;

const FAST_SPAN: usize = 14;
const SLOW_SPAN: usize = 28;
const RETURN_LOOKBACK: usize = 12;
const RANGE_WINDOW: usize = 10;
const VOLUME_WINDOW: usize = 20;

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn tail<T>(values: &[T], n: usize) -> &[T] {
    &values[values.len().saturating_sub(n)..]
}

/// Ordering score, higher is better. Bars with a non-finite field are skipped.
pub fn rank_score(bars: &[OhlcvBar], state: Option<MarketState>) -> f64 {
    let usable: Vec<&OhlcvBar> = bars
        .iter()
        .filter(|b| [b.high, b.low, b.close, b.volume].iter().all(|v| v.is_finite()))
        .collect();
    let n = usable.len();
    if n < MIN_RANK_BARS {
        return 0.0;
    }
    let closes: Vec<f64> = usable.iter().map(|b| b.close).collect();
    let last = closes[n - 1];
    let prev = closes[n - RETURN_LOOKBACK];

    let ret = if last > 0.0 && prev > 0.0 {
        last / prev - 1.0
    } else {
        0.0
    };

    let trend = match (
        calculate_ema(&closes, FAST_SPAN).last().copied().flatten(),
        calculate_ema(&closes, SLOW_SPAN).last().copied().flatten(),
    ) {
        (Some(fast), Some(slow)) if last > 0.0 => (fast - slow) / last,
        _ => 0.0,
    };

    let ranges: Vec<f64> = usable.iter().map(|b| (b.high - b.low).abs()).collect();
    let avg_close = mean(tail(&closes, RANGE_WINDOW));
    let volatility = if avg_close != 0.0 {
        mean(tail(&ranges, RANGE_WINDOW)) / avg_close
    } else {
        0.0
    };

    let volumes: Vec<f64> = usable.iter().map(|b| b.volume).collect();
    let avg_volume = mean(tail(&volumes, VOLUME_WINDOW));
    let rel_volume = if avg_volume > 0.0 {
        volumes[n - 1] / avg_volume
    } else {
        0.0
    };

    let ret = ret.clamp(-0.20, 0.20);
    let trend = trend.clamp(-0.05, 0.05);
    let volatility = volatility.clamp(0.0, 0.20);
    let volume_boost = (rel_volume.clamp(0.0, 10.0) / 3.0).min(3.0);

    let mut score = ret * 0.60 + trend * 0.40;
    if volatility < 0.005 {
        score *= 0.85;
    } else if volatility > 0.12 {
        score *= 0.90;
    }
    score *= 1.0 + volume_boost * 0.05;
    score *= match state {
        Some(MarketState::Bull) => 1.08,
        Some(MarketState::Bear) => 0.85,
        _ => 1.0,
    };

    if score.is_finite() { score } else { 0.0 }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedSymbol {
    pub symbol: String,
    pub score: f64,
    pub state: Option<MarketState>,
}

/// Best score first, ties kept in input order; `top` truncates.
pub fn rank_symbols(mut entries: Vec<RankedSymbol>, top: Option<usize>) -> Vec<RankedSymbol> {
    entries.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    if let Some(n) = top {
        entries.truncate(n);
    }
    entries
}
