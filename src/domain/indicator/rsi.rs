//! RSI (Relative Strength Index) indicator.
//!
//! Average gain/loss are simple rolling means of the last n close-to-close
//! changes (not Wilder smoothing).
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! avg_loss == 0 leaves RS undefined, even after a run of pure gains.
//! Undefined values, including the first n rows, read as the neutral 50.

use super::{rolling_mean, Series};

pub const NEUTRAL_RSI: f64 = 50.0;

pub fn calculate_rsi(closes: &[f64], period: usize) -> Series {
    if closes.is_empty() {
        return Vec::new();
    }

    let mut gains: Series = Vec::with_capacity(closes.len());
    let mut losses: Series = Vec::with_capacity(closes.len());
    gains.push(None);
    losses.push(None);
    for w in closes.windows(2) {
        let change = w[1] - w[0];
        if change.is_finite() {
            gains.push(Some(change.max(0.0)));
            losses.push(Some((-change).max(0.0)));
        } else {
            gains.push(None);
            losses.push(None);
        }
    }

    let avg_gain = rolling_mean(&gains, period);
    let avg_loss = rolling_mean(&losses, period);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(g, l)| {
            let rsi = match (g, l) {
                (Some(g), Some(l)) if *l > 0.0 => 100.0 - (100.0 / (1.0 + g / l)),
                _ => NEUTRAL_RSI,
            };
            Some(rsi)
        })
        .collect()
}
