//! Trading signal representation.

use std::fmt;

use super::market_state::MarketState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Buy,
    Sell,
    Hold,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Buy => "BUY",
            SignalKind::Sell => "SELL",
            SignalKind::Hold => "HOLD",
        }
    }

    pub fn is_actionable(&self) -> bool {
        !matches!(self, SignalKind::Hold)
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable reason attached to every HOLD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HoldReason {
    NoMarketData,
    MissingClose,
    NoUsableFeatures,
    ModelPredictFailed,
    DeadMarket,
    FilteredByInstitutionalRules,
    DrawdownLimit,
    LowProbability,
    InvalidTradeGeometry,
    HtfMisalignment,
    Warmup,
}

impl HoldReason {
    pub fn code(&self) -> &'static str {
        match self {
            HoldReason::NoMarketData => "no_market_data",
            HoldReason::MissingClose => "missing_close",
            HoldReason::NoUsableFeatures => "no_usable_features",
            HoldReason::ModelPredictFailed => "model_predict_failed",
            HoldReason::DeadMarket => "dead_market",
            HoldReason::FilteredByInstitutionalRules => "filtered_by_institutional_rules",
            HoldReason::DrawdownLimit => "drawdown_limit",
            HoldReason::LowProbability => "low_probability",
            HoldReason::InvalidTradeGeometry => "invalid_trade_geometry",
            HoldReason::HtfMisalignment => "htf_misalignment",
            HoldReason::Warmup => "warmup",
        }
    }
}

impl fmt::Display for HoldReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub kind: SignalKind,
    pub entry: Option<f64>,
    pub stop: Option<f64>,
    pub take_profit: Option<f64>,
    pub probability: f64,
    pub regime: Option<MarketState>,
    pub reason: Option<HoldReason>,
}

impl Signal {
    /// HOLD without price levels.
    pub fn hold(reason: HoldReason) -> Self {
        Signal {
            kind: SignalKind::Hold,
            entry: None,
            stop: None,
            take_profit: None,
            probability: 0.0,
            regime: None,
            reason: Some(reason),
        }
    }

    pub fn is_hold(&self) -> bool {
        self.kind == SignalKind::Hold
    }

    /// Downgrade to HOLD keeping price levels and probability for diagnostics.
    pub fn into_hold(self, reason: HoldReason) -> Self {
        Signal {
            kind: SignalKind::Hold,
            reason: Some(reason),
            ..self
        }
    }
}
