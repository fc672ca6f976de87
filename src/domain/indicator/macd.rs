//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9

use super::{calculate_ema, calculate_ema_opt, Series};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct MacdColumns {
    pub line: Series,
    pub signal: Series,
    pub histogram: Series,
}

pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal_period: usize) -> MacdColumns {
    let ema_fast = calculate_ema(closes, fast);
    let ema_slow = calculate_ema(closes, slow);

    let line: Series = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();
    let signal = calculate_ema_opt(&line, signal_period);
    let histogram = line
        .iter()
        .zip(&signal)
        .map(|(l, s)| Some((*l)? - (*s)?))
        .collect();

    MacdColumns {
        line,
        signal,
        histogram,
    }
}
