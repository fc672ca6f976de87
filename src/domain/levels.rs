//! ATR-anchored stop-loss and take-profit levels, rounded to 4 decimals.

use super::bar::{columns, Bar};
use super::signal::SignalKind;

pub const RISK_REWARD: f64 = 2.0;

/// Fraction of close substituted for ATR when the bar has no usable ATR.
pub const ATR_PROXY_FRACTION: f64 = 0.005;

fn round_level(value: f64) -> f64 {
    (value * 1e4).round() / 1e4
}

/// ATR of the bar, or the `close × 0.005` proxy when ATR is absent, non-finite
/// or not positive.
pub fn volatility(bar: &Bar) -> f64 {
    match bar.value(columns::ATR) {
        Some(atr) if atr > 0.0 => atr,
        _ => bar.close * ATR_PROXY_FRACTION,
    }
}

/// HOLD uses the long-side stop.
pub fn stop_loss(bar: &Bar, kind: SignalKind) -> f64 {
    let atr = volatility(bar);
    let stop = match kind {
        SignalKind::Buy | SignalKind::Hold => bar.close - atr,
        SignalKind::Sell => bar.close + atr,
    };
    round_level(stop)
}

/// HOLD projects a single unit of risk upward.
pub fn take_profit(entry: f64, stop: f64, kind: SignalKind, rr: f64) -> f64 {
    let risk = (entry - stop).abs();
    let target = match kind {
        SignalKind::Buy => entry + risk * rr,
        SignalKind::Sell => entry - risk * rr,
        SignalKind::Hold => entry + risk,
    };
    round_level(target)
}
