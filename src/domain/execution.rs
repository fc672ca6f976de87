//! Trade outcome resolution against later bars.
//!
//! Scans forward from the entry bar using intrabar extremes. The stop is
//! checked before the target on each bar, so a bar touching both counts as a
//! loss.

use super::bar::Bar;
use super::position::Side;
use super::signal::{Signal, SignalKind};

#[derive(Debug, Clone, PartialEq)]
pub struct TradeOutcome {
    pub side: Side,
    pub entry: f64,
    pub exit: f64,
    /// Per unit traded.
    pub pnl: f64,
    /// pnl in units of the initial stop distance.
    pub r_multiple: f64,
    pub win: bool,
    /// Bars from entry to exit.
    pub duration: usize,
}

/// Resolve `signal`, issued on `bars[entry_index]`, against the bars after it.
/// `None` for HOLD, missing levels, a zero stop distance, or when neither level
/// is reached before the series ends.
pub fn resolve_trade(signal: &Signal, bars: &[Bar], entry_index: usize) -> Option<TradeOutcome> {
    let side = match signal.kind {
        SignalKind::Buy => Side::Long,
        SignalKind::Sell => Side::Short,
        SignalKind::Hold => return None,
    };
    let entry = signal
        .entry
        .or_else(|| bars.get(entry_index).map(|b| b.close))?;
    let stop = signal.stop?;
    let target = signal.take_profit?;
    let risk = (entry - stop).abs();
    if !risk.is_finite() || risk == 0.0 {
        return None;
    }

    bars.iter()
        .enumerate()
        .skip(entry_index + 1)
        .find_map(|(j, bar)| {
            let (stop_hit, target_hit) = match side {
                Side::Long => (bar.low <= stop, bar.high >= target),
                Side::Short => (bar.high >= stop, bar.low <= target),
            };
            let exit = if stop_hit {
                stop
            } else if target_hit {
                target
            } else {
                return None;
            };
            let pnl = side.sign() * (exit - entry);
            Some(TradeOutcome {
                side,
                entry,
                exit,
                pnl,
                r_multiple: pnl / risk,
                win: pnl > 0.0,
                duration: j - entry_index,
            })
        })
}
