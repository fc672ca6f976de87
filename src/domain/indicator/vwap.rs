//! Rolling VWAP proxy.
//!
//! A session VWAP needs intraday resets; for arbitrary timeframes a rolling
//! window is used instead:
//! VWAP[i] = SUM(typical_price * volume, n) / SUM(volume, n)

use super::{rolling_sum, safe_div, Series};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_PERIOD: usize = 20;

pub fn calculate_vwap(bars: &[OhlcvBar], period: usize) -> Series {
    let pv: Series = bars
        .iter()
        .map(|b| {
            let v = b.typical_price() * b.volume;
            v.is_finite().then_some(v)
        })
        .collect();
    let volume: Series = bars
        .iter()
        .map(|b| b.volume.is_finite().then_some(b.volume))
        .collect();

    rolling_sum(&pv, period)
        .into_iter()
        .zip(rolling_sum(&volume, period))
        .map(|(num, den)| safe_div(num, den))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(close: f64, volume: f64) -> OhlcvBar {
        OhlcvBar {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume,
        }
    }

    #[test]
    fn volume_weighted() {
        let bars = vec![bar(10.0, 1.0), bar(20.0, 3.0)];
        let vwap = calculate_vwap(&bars, 2);
        assert_eq!(vwap[0], None);
        // (10*1 + 20*3) / 4 = 17.5
        assert!((vwap[1].unwrap() - 17.5).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_volume_is_undefined() {
        let bars = vec![bar(10.0, 0.0), bar(20.0, 0.0)];
        assert_eq!(calculate_vwap(&bars, 2)[1], None);
    }
}
