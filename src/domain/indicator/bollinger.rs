//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the sample standard deviation (divides by N-1).
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) rows are missing.

use super::{rolling_mean, rolling_std, to_series, Series};

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerColumns {
    pub upper: Series,
    pub middle: Series,
    pub lower: Series,
}

pub fn calculate_bollinger(closes: &[f64], period: usize, multiplier: f64) -> BollingerColumns {
    let lifted = to_series(closes);
    let middle = rolling_mean(&lifted, period);
    let stddev = rolling_std(&lifted, period);

    let band = |sign: f64| -> Series {
        middle
            .iter()
            .zip(&stddev)
            .map(|(m, s)| Some((*m)? + sign * multiplier * (*s)?))
            .collect()
    };

    BollingerColumns {
        upper: band(1.0),
        lower: band(-1.0),
        middle,
    }
}
