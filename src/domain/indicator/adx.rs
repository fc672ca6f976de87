//! ADX (Average Directional Index) with the directional indicators.
//!
//! +DM = up move when it exceeds the down move and is positive, else 0
//! -DM = down move when it exceeds the up move and is positive, else 0
//! +DI = 100 * SUM(+DM, n) / ATR(n),  -DI likewise
//! DX  = 100 * |+DI - -DI| / (+DI + -DI)
//! ADX = rolling mean of DX over n
//!
//! ATR here is the simple rolling mean of true range, matching [`super::calculate_atr`].

use super::{calculate_atr, rolling_mean, rolling_sum, safe_div, Series};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_PERIOD: usize = 14;

#[derive(Debug, Clone, PartialEq)]
pub struct AdxColumns {
    pub adx: Series,
    pub plus_di: Series,
    pub minus_di: Series,
}

pub fn calculate_adx(bars: &[OhlcvBar], period: usize) -> AdxColumns {
    let mut plus_dm: Series = Vec::with_capacity(bars.len());
    let mut minus_dm: Series = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        if i == 0 {
            plus_dm.push(Some(0.0));
            minus_dm.push(Some(0.0));
            continue;
        }
        let up_move = bar.high - bars[i - 1].high;
        let down_move = bars[i - 1].low - bar.low;
        plus_dm.push(Some(if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        }));
        minus_dm.push(Some(if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        }));
    }

    let atr = calculate_atr(bars, period);
    let plus_sum = rolling_sum(&plus_dm, period);
    let minus_sum = rolling_sum(&minus_dm, period);

    let plus_di: Series = plus_sum
        .iter()
        .zip(&atr)
        .map(|(s, a)| safe_div(*s, *a).map(|v| 100.0 * v))
        .collect();
    let minus_di: Series = minus_sum
        .iter()
        .zip(&atr)
        .map(|(s, a)| safe_div(*s, *a).map(|v| 100.0 * v))
        .collect();

    let dx: Series = plus_di
        .iter()
        .zip(&minus_di)
        .map(|(p, m)| {
            let (p, m) = ((*p)?, (*m)?);
            safe_div(Some((p - m).abs()), Some(p + m)).map(|v| 100.0 * v)
        })
        .collect();

    AdxColumns {
        adx: rolling_mean(&dx, period),
        plus_di,
        minus_di,
    }
}
