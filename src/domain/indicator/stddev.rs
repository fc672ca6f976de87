//! Rolling window statistics (mean, sum, sample standard deviation).
//!
//! A window yields a value only when all of its `period` entries are present.
//! Standard deviation uses the sample estimator (divides by n - 1).

use super::Series;

fn window_values(values: &[Option<f64>], i: usize, period: usize) -> Option<Vec<f64>> {
    if period == 0 || i + 1 < period {
        return None;
    }
    values[i + 1 - period..=i].iter().copied().collect()
}

pub fn rolling_sum(values: &[Option<f64>], period: usize) -> Series {
    (0..values.len())
        .map(|i| window_values(values, i, period).map(|w| w.iter().sum()))
        .collect()
}

pub fn rolling_mean(values: &[Option<f64>], period: usize) -> Series {
    (0..values.len())
        .map(|i| window_values(values, i, period).map(|w| w.iter().sum::<f64>() / period as f64))
        .collect()
}

pub fn rolling_std(values: &[Option<f64>], period: usize) -> Series {
    if period < 2 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            let window = window_values(values, i, period)?;
            let mean = window.iter().sum::<f64>() / period as f64;
            let variance = window
                .iter()
                .map(|v| {
                    let diff = v - mean;
                    diff * diff
                })
                .sum::<f64>()
                / (period - 1) as f64;
            Some(variance.sqrt())
        })
        .collect()
}
