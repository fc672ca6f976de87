//! Average True Range: simple rolling mean of the true range.
//!
//! The first bar has no previous close, so its true range is high - low.

use super::{rolling_mean, Series};
use crate::domain::ohlcv::OhlcvBar;

pub fn true_ranges(bars: &[OhlcvBar]) -> Series {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let tr = if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            };
            tr.is_finite().then_some(tr)
        })
        .collect()
}

pub fn calculate_atr(bars: &[OhlcvBar], period: usize) -> Series {
    rolling_mean(&true_ranges(bars), period)
}
