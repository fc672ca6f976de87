//! Signal engine: fuses model probability, market state and technical
//! confirmation into a BUY/SELL/HOLD decision with price levels.
//!
//! Every fault degrades to a HOLD carrying a [`HoldReason`]; `generate` never
//! fails and only reads the window it is given.

use tracing::{debug, warn};

use super::bar::{columns, Bar};
use super::levels::{stop_loss, take_profit, RISK_REWARD};
use super::market_state::{MarketState, MarketStateDetector};
use super::model::{FeatureRow, ProbabilityModel};
use super::signal::{HoldReason, Signal, SignalKind};

pub const DEFAULT_THRESHOLD: f64 = 0.55;
pub const MIN_THRESHOLD: f64 = 0.50;
pub const MAX_THRESHOLD: f64 = 0.90;

pub const RANGE_PENALTY: f64 = 0.08;
pub const TREND_PENALTY: f64 = 0.02;

pub const RSI_BULL: f64 = 55.0;
pub const RSI_BEAR: f64 = 45.0;
pub const ADX_MIN: f64 = 18.0;
pub const VOL_RATIO_MIN: f64 = 1.05;

/// Values of the last bar that the confirmation rules read.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Confirmation {
    close: f64,
    ema20: f64,
    ema50: f64,
    rsi: f64,
    adx: f64,
    macd: f64,
    macd_signal: f64,
    macd_hist: f64,
    vol_ratio: f64,
    vwap: Option<f64>,
}

impl Confirmation {
    /// `None` when close or either EMA is unavailable.
    fn read(bar: &Bar) -> Option<Self> {
        Some(Confirmation {
            close: bar.value(columns::CLOSE)?,
            ema20: bar.first_of(&[columns::EMA20, columns::EMA_20])?,
            ema50: bar.first_of(&[columns::EMA50, columns::EMA_50])?,
            rsi: bar.value(columns::RSI).unwrap_or(50.0),
            adx: bar.value(columns::ADX).unwrap_or(0.0),
            macd: bar.value(columns::MACD).unwrap_or(0.0),
            macd_signal: bar.value(columns::MACD_SIGNAL).unwrap_or(0.0),
            macd_hist: bar.value(columns::MACD_HIST).unwrap_or(0.0),
            vol_ratio: bar.value(columns::VOL_RATIO).unwrap_or(1.0),
            vwap: bar.value(columns::VWAP),
        })
    }

    fn bullish(&self) -> bool {
        self.close > self.ema50
            && self.ema20 > self.ema50
            && self.rsi >= RSI_BULL
            && self.adx >= ADX_MIN
            && (self.macd > self.macd_signal || self.macd_hist > 0.0)
            && self.vol_ratio >= VOL_RATIO_MIN
            && self.vwap.is_none_or(|vwap| self.close >= vwap)
    }

    fn bearish(&self) -> bool {
        self.close < self.ema50
            && self.ema20 < self.ema50
            && self.rsi <= RSI_BEAR
            && self.adx >= ADX_MIN
            && (self.macd < self.macd_signal || self.macd_hist < 0.0)
            && self.vol_ratio >= VOL_RATIO_MIN
            && self.vwap.is_none_or(|vwap| self.close <= vwap)
    }
}

/// Effective threshold and permitted directions after market-state gating.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Gate {
    threshold: f64,
    allow_buy: bool,
    allow_sell: bool,
}

impl Gate {
    fn new(base: f64, state: Option<MarketState>) -> Self {
        let open = Gate {
            threshold: base,
            allow_buy: true,
            allow_sell: true,
        };
        match state {
            None | Some(MarketState::Dead) => open,
            Some(MarketState::Range) => Gate {
                threshold: base + RANGE_PENALTY,
                allow_sell: false,
                ..open
            },
            Some(MarketState::Bull) => Gate {
                threshold: base + TREND_PENALTY,
                allow_sell: false,
                ..open
            },
            Some(MarketState::Bear) => Gate {
                threshold: base + TREND_PENALTY,
                allow_buy: false,
                ..open
            },
        }
    }
}

pub struct SignalEngine {
    model: Box<dyn ProbabilityModel>,
    threshold: f64,
    detector: Option<Box<dyn MarketStateDetector>>,
}

impl std::fmt::Debug for SignalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalEngine")
            .field("features", &self.model.feature_columns())
            .field("threshold", &self.threshold)
            .field("detector", &self.detector.is_some())
            .finish()
    }
}

/// Clamp a base threshold into [0.50, 0.90]; NaN falls back to the default.
pub fn clamp_threshold(threshold: f64) -> f64 {
    if threshold.is_nan() {
        warn!(threshold, fallback = DEFAULT_THRESHOLD, "threshold is not a number, using default");
        return DEFAULT_THRESHOLD;
    }
    let clamped = threshold.clamp(MIN_THRESHOLD, MAX_THRESHOLD);
    if clamped != threshold {
        warn!(threshold, clamped, "signal threshold out of range, clamped");
    }
    clamped
}

impl SignalEngine {
    pub fn new(
        model: Box<dyn ProbabilityModel>,
        threshold: f64,
        detector: Option<Box<dyn MarketStateDetector>>,
    ) -> Self {
        SignalEngine {
            model,
            threshold: clamp_threshold(threshold),
            detector,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn model(&self) -> &dyn ProbabilityModel {
        self.model.as_ref()
    }

    /// Decide on the last bar of `window`.
    pub fn generate(&self, window: &[Bar]) -> Signal {
        let Some(last) = window.last() else {
            return Signal::hold(HoldReason::NoMarketData);
        };
        let Some(price) = last.value(columns::CLOSE) else {
            return Signal::hold(HoldReason::MissingClose);
        };

        let row = FeatureRow::from_bar(last, self.model.feature_columns());
        if row.is_empty() {
            return hold_at(last, price, 0.0, None, HoldReason::NoUsableFeatures);
        }

        let probability = match self.model.predict_proba(&row) {
            Ok(p) if p.is_finite() && (0.0..=1.0).contains(&p) => p,
            Ok(p) => {
                debug!(probability = p, "model returned a value outside [0, 1]");
                return hold_at(last, price, 0.0, None, HoldReason::ModelPredictFailed);
            }
            Err(e) => {
                debug!(error = %e, "model prediction failed");
                return hold_at(last, price, 0.0, None, HoldReason::ModelPredictFailed);
            }
        };

        let state = self.detector.as_ref().and_then(|d| d.detect(window));
        if state == Some(MarketState::Dead) {
            return hold_at(last, price, probability, state, HoldReason::DeadMarket);
        }
        let gate = Gate::new(self.threshold, state);

        let confirmation = Confirmation::read(last);
        let bullish = confirmation.is_some_and(|c| c.bullish());
        let bearish = confirmation.is_some_and(|c| c.bearish());

        let kind = if gate.allow_buy && probability >= gate.threshold && bullish {
            SignalKind::Buy
        } else if gate.allow_sell && bearish {
            SignalKind::Sell
        } else {
            debug!(
                probability,
                threshold = gate.threshold,
                state = ?state,
                bullish,
                bearish,
                "signal filtered"
            );
            return hold_at(
                last,
                price,
                probability,
                state,
                HoldReason::FilteredByInstitutionalRules,
            );
        };

        let stop = stop_loss(last, kind);
        let target = take_profit(price, stop, kind, RISK_REWARD);
        debug!(
            kind = %kind,
            price,
            stop,
            take_profit = target,
            probability,
            "signal generated"
        );
        Signal {
            kind,
            entry: Some(price),
            stop: Some(stop),
            take_profit: Some(target),
            probability,
            regime: state,
            reason: None,
        }
    }
}

/// Downgrade a signal that trades against the higher-timeframe state.
///
/// BUY needs a bull HTF, SELL needs a bear HTF. An undetermined HTF state
/// blocks both. HOLD passes through.
pub fn htf_filter(signal: Signal, htf_state: Option<MarketState>) -> Signal {
    let aligned = match signal.kind {
        SignalKind::Hold => return signal,
        SignalKind::Buy => htf_state == Some(MarketState::Bull),
        SignalKind::Sell => htf_state == Some(MarketState::Bear),
    };
    if aligned {
        signal
    } else {
        debug!(kind = %signal.kind, htf = ?htf_state, "signal against higher timeframe");
        signal.into_hold(HoldReason::HtfMisalignment)
    }
}

/// HOLD with the diagnostic levels of the HOLD policy.
fn hold_at(
    bar: &Bar,
    price: f64,
    probability: f64,
    state: Option<MarketState>,
    reason: HoldReason,
) -> Signal {
    let stop = stop_loss(bar, SignalKind::Hold);
    Signal {
        kind: SignalKind::Hold,
        entry: Some(price),
        stop: Some(stop),
        take_profit: Some(take_profit(price, stop, SignalKind::Hold, RISK_REWARD)),
        probability,
        regime: state,
        reason: Some(reason),
    }
}
