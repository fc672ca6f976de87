//! Technical indicator implementations.
//!
//! Every indicator works on column vectors and yields a [`Series`]: one entry per
//! input row, `None` while the indicator is still warming up or when the value is
//! undefined (zero denominators, missing inputs).

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod stddev;
pub mod vwap;

pub use adx::{calculate_adx, AdxColumns};
pub use atr::{calculate_atr, true_ranges};
pub use bollinger::{calculate_bollinger, BollingerColumns};
pub use ema::{calculate_ema, calculate_ema_opt};
pub use macd::{calculate_macd, MacdColumns};
pub use rsi::calculate_rsi;
pub use stddev::{rolling_mean, rolling_std, rolling_sum};
pub use vwap::calculate_vwap;

/// Indicator output aligned with the input rows.
pub type Series = Vec<Option<f64>>;

/// Lift a plain column into a [`Series`], treating non-finite entries as missing.
pub fn to_series(values: &[f64]) -> Series {
    values
        .iter()
        .map(|v| v.is_finite().then_some(*v))
        .collect()
}

/// `numerator / denominator`, `None` when either side is missing or the
/// denominator is zero.
pub(crate) fn safe_div(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => {
            let v = n / d;
            v.is_finite().then_some(v)
        }
        _ => None,
    }
}
