//! Feature provider: raw OHLCV candles to indicator-enriched [`Bar`]s.
//!
//! Produces every column the regime classifier, signal engine and probability
//! model read. Any malformed input yields an empty series rather than an error.

use tracing::warn;

use super::bar::{columns, Bar};
use super::indicator::{
    adx, bollinger, calculate_adx, calculate_atr, calculate_bollinger, calculate_ema,
    calculate_macd, calculate_rsi, calculate_vwap, macd, rolling_mean, rolling_std, safe_div,
    to_series, vwap, Series,
};
use super::ohlcv::OhlcvBar;

pub const EMA_20_SPAN: usize = 20;
pub const EMA_50_SPAN: usize = 50;
pub const RSI_PERIOD: usize = 14;
pub const ATR_PERIOD: usize = 14;
pub const VOLATILITY_PERIOD: usize = 20;
pub const VOLUME_MA_PERIOD: usize = 20;

pub fn build_features(ohlcv: &[OhlcvBar]) -> Vec<Bar> {
    if ohlcv.is_empty() {
        return Vec::new();
    }
    if let Some(pos) = ohlcv.iter().position(|b| !b.is_well_formed()) {
        warn!(row = pos, "malformed OHLCV row, discarding series");
        return Vec::new();
    }

    let closes: Vec<f64> = ohlcv.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = ohlcv.iter().map(|b| b.volume).collect();

    let ema_20 = calculate_ema(&closes, EMA_20_SPAN);
    let ema_50 = calculate_ema(&closes, EMA_50_SPAN);
    let ema_fast = calculate_ema(&closes, macd::DEFAULT_FAST);
    let ema_slow = calculate_ema(&closes, macd::DEFAULT_SLOW);
    let rsi = calculate_rsi(&closes, RSI_PERIOD);
    let atr = calculate_atr(ohlcv, ATR_PERIOD);

    let returns: Series = std::iter::once(None)
        .chain(
            closes
                .windows(2)
                .map(|w| safe_div(Some(w[1] - w[0]), Some(w[0]))),
        )
        .collect();
    let volatility = rolling_std(&returns, VOLATILITY_PERIOD);

    let macd_cols = calculate_macd(
        &closes,
        macd::DEFAULT_FAST,
        macd::DEFAULT_SLOW,
        macd::DEFAULT_SIGNAL,
    );
    let adx_cols = calculate_adx(ohlcv, adx::DEFAULT_PERIOD);
    let vwap_col = calculate_vwap(ohlcv, vwap::DEFAULT_PERIOD);
    let bands = calculate_bollinger(
        &closes,
        bollinger::DEFAULT_PERIOD,
        bollinger::DEFAULT_MULTIPLIER,
    );

    let vol_ma = rolling_mean(&to_series(&volumes), VOLUME_MA_PERIOD);
    let vol_ratio: Series = volumes
        .iter()
        .zip(&vol_ma)
        .map(|(v, ma)| safe_div(Some(*v), *ma))
        .collect();

    // ADX and the DI lines read as 0 while undefined
    let filled_zero =
        |s: &Series| -> Series { s.iter().map(|v| Some(v.unwrap_or(0.0))).collect() };
    let adx_col = filled_zero(&adx_cols.adx);
    let plus_di = filled_zero(&adx_cols.plus_di);
    let minus_di = filled_zero(&adx_cols.minus_di);

    let named: [(&str, &Series); 22] = [
        (columns::EMA_20, &ema_20),
        (columns::EMA_50, &ema_50),
        (columns::EMA20, &ema_20),
        (columns::EMA50, &ema_50),
        (columns::EMA_FAST, &ema_fast),
        (columns::EMA_SLOW, &ema_slow),
        (columns::RSI, &rsi),
        (columns::ATR, &atr),
        (columns::RETURN, &returns),
        (columns::VOLATILITY, &volatility),
        (columns::MACD, &macd_cols.line),
        (columns::MACD_SIGNAL, &macd_cols.signal),
        (columns::MACD_HIST, &macd_cols.histogram),
        (columns::ADX, &adx_col),
        (columns::PLUS_DI, &plus_di),
        (columns::MINUS_DI, &minus_di),
        (columns::VWAP, &vwap_col),
        (columns::BB_MID, &bands.middle),
        (columns::BB_UP, &bands.upper),
        (columns::BB_LOW, &bands.lower),
        (columns::VOL_MA20, &vol_ma),
        (columns::VOL_RATIO, &vol_ratio),
    ];

    ohlcv
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let mut bar = Bar::from_ohlcv(raw);
            for (column, series) in &named {
                if let Some(v) = series[i] {
                    bar.set(column, v);
                }
            }
            bar
        })
        .collect()
}
