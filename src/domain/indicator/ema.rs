//! Exponential Moving Average indicator.
//!
//! Recursive form without bias adjustment: alpha = 2/(span+1), seeded with the
//! first available value, then EMA[i] = x[i]*alpha + EMA[i-1]*(1-alpha).
//! A missing input carries the previous EMA forward.

use super::Series;

pub fn calculate_ema(values: &[f64], span: usize) -> Series {
    let lifted: Series = values.iter().map(|v| v.is_finite().then_some(*v)).collect();
    calculate_ema_opt(&lifted, span)
}

pub fn calculate_ema_opt(values: &[Option<f64>], span: usize) -> Series {
    if span == 0 {
        return vec![None; values.len()];
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut ema: Option<f64> = None;

    values
        .iter()
        .map(|value| {
            ema = match (ema, value) {
                (None, Some(x)) => Some(*x),
                (Some(prev), Some(x)) => Some(x * alpha + prev * (1.0 - alpha)),
                (prev, None) => prev,
            };
            ema
        })
        .collect()
}
