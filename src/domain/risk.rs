//! Risk manager: turns a signal, equity and drawdown into a sized trade plan.
//!
//! Two risk policies exist. The probability ladder scales risk with model
//! confidence; the drawdown override cuts risk as equity falls from its peak
//! and blocks new trades past the hard limit. When combined, the drawdown
//! override wins. Sizing goes through [`position_size`] only.

use std::fmt;

use tracing::{debug, warn};

use super::signal::{HoldReason, Signal, SignalKind};

pub const BASE_RISK_PCT: f64 = 0.01;
pub const MIN_RISK_PCT: f64 = 0.005;
pub const DD_SOFT: f64 = 0.10;
pub const DD_HARD: f64 = 0.25;
pub const R_TARGET: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskConfig {
    /// Ladder risk at moderate confidence.
    pub base_risk: f64,
    /// Ladder ceiling.
    pub max_risk: f64,
    /// Ladder floor: below this the ladder returns no risk.
    pub min_probability: f64,
    pub dd_soft: f64,
    pub dd_hard: f64,
    /// Drawdown-policy risk outside the soft zone.
    pub base_risk_pct: f64,
    /// Drawdown-policy risk inside the soft zone.
    pub min_risk_pct: f64,
    pub r_target: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            base_risk: 0.01,
            max_risk: 0.0125,
            min_probability: 0.60,
            dd_soft: DD_SOFT,
            dd_hard: DD_HARD,
            base_risk_pct: BASE_RISK_PCT,
            min_risk_pct: MIN_RISK_PCT,
            r_target: R_TARGET,
        }
    }
}

fn clamp_field(name: &'static str, value: f64, lo: f64, hi: f64, fallback: f64) -> f64 {
    if !value.is_finite() {
        warn!(field = name, fallback, "risk parameter is not finite, using default");
        return fallback;
    }
    let clamped = value.clamp(lo, hi);
    if clamped != value {
        warn!(field = name, value, clamped, "risk parameter out of range, clamped");
    }
    clamped
}

impl RiskConfig {
    /// Clamp every field into a usable range. Never fails.
    pub fn sanitized(self) -> Self {
        let d = RiskConfig::default();
        let base_risk = clamp_field("base_risk", self.base_risk, 0.0, 1.0, d.base_risk);
        let max_risk = clamp_field("max_risk", self.max_risk, base_risk, 1.0, d.max_risk.max(base_risk));
        let min_probability =
            clamp_field("min_probability", self.min_probability, 0.0, 1.0, d.min_probability);
        let dd_hard = clamp_field("dd_hard", self.dd_hard, 0.01, 1.0, d.dd_hard);
        let dd_soft = clamp_field("dd_soft", self.dd_soft, 0.0, dd_hard, d.dd_soft.min(dd_hard));
        let base_risk_pct = clamp_field("base_risk_pct", self.base_risk_pct, 0.0, 1.0, d.base_risk_pct);
        let min_risk_pct = clamp_field(
            "min_risk_pct",
            self.min_risk_pct,
            0.0,
            base_risk_pct,
            d.min_risk_pct.min(base_risk_pct),
        );
        let r_target = if self.r_target.is_finite() && self.r_target > 0.0 {
            self.r_target
        } else {
            warn!(value = self.r_target, fallback = d.r_target, "r_target must be positive, using default");
            d.r_target
        };
        RiskConfig {
            base_risk,
            max_risk,
            min_probability,
            dd_soft,
            dd_hard,
            base_risk_pct,
            min_risk_pct,
            r_target,
        }
    }

    /// Probability ladder.
    pub fn risk_by_probability(&self, probability: f64) -> f64 {
        if !probability.is_finite() || probability < self.min_probability {
            0.0
        } else if probability < 0.68 {
            self.base_risk * 0.5
        } else if probability < 0.75 {
            self.base_risk
        } else {
            (self.base_risk * 1.25).min(self.max_risk)
        }
    }

    /// Drawdown override. A non-finite drawdown blocks risk.
    pub fn risk_by_drawdown(&self, current_dd: f64) -> f64 {
        if current_dd.is_nan() || current_dd >= self.dd_hard {
            0.0
        } else if current_dd >= self.dd_soft {
            self.min_risk_pct
        } else {
            self.base_risk_pct
        }
    }
}

/// Drawdown override with the stock constants.
pub fn adjust_risk_by_drawdown(current_dd: f64) -> f64 {
    RiskConfig::default().risk_by_drawdown(current_dd)
}

/// Units to trade so that hitting `stop` loses `equity × risk_pct`, rounded
/// to 6 decimals. Zero for any degenerate input.
pub fn position_size(equity: f64, risk_pct: f64, entry: f64, stop: f64) -> f64 {
    let finite = [equity, risk_pct, entry, stop].iter().all(|v| v.is_finite());
    if !finite || equity <= 0.0 || risk_pct <= 0.0 || entry <= 0.0 || stop <= 0.0 || entry == stop {
        return 0.0;
    }
    let size = (equity * risk_pct) / (entry - stop).abs();
    if !size.is_finite() {
        return 0.0;
    }
    (size * 1e6).round() / 1e6
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RiskPolicy {
    Drawdown,
    ProbabilityLadder,
    #[default]
    Combined,
}

impl RiskPolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "drawdown" => Some(RiskPolicy::Drawdown),
            "probability" | "ladder" | "probability_ladder" => Some(RiskPolicy::ProbabilityLadder),
            "combined" => Some(RiskPolicy::Combined),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    DrawdownLimit,
    LowProbability,
    InvalidTradeGeometry,
}

impl RejectReason {
    pub fn hold_reason(&self) -> HoldReason {
        match self {
            RejectReason::DrawdownLimit => HoldReason::DrawdownLimit,
            RejectReason::LowProbability => HoldReason::LowProbability,
            RejectReason::InvalidTradeGeometry => HoldReason::InvalidTradeGeometry,
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.hold_reason(), f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradePlan {
    pub entry: f64,
    pub stop: f64,
    pub take_profit: f64,
    pub position_size: f64,
    pub risk_pct: f64,
    pub probability: f64,
}

impl TradePlan {
    /// Capital lost if the stop is hit.
    pub fn risk_amount(&self) -> f64 {
        (self.entry - self.stop).abs() * self.position_size
    }
}

/// A signal after risk enrichment. `plan` is `Some` only for an actionable signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub signal: Signal,
    pub plan: Option<TradePlan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RiskManager {
    config: RiskConfig,
    policy: RiskPolicy,
}

impl RiskManager {
    pub fn new(config: RiskConfig, policy: RiskPolicy) -> Self {
        RiskManager {
            config: config.sanitized(),
            policy,
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn policy(&self) -> RiskPolicy {
        self.policy
    }

    /// Same limits under a different policy.
    pub fn with_policy(&self, policy: RiskPolicy) -> Self {
        RiskManager { policy, ..*self }
    }

    /// Risk fraction for a trade, or why none is allowed.
    pub fn risk_pct(&self, probability: f64, current_dd: f64) -> Result<f64, RejectReason> {
        let by_drawdown = || match self.config.risk_by_drawdown(current_dd) {
            r if r > 0.0 => Ok(r),
            _ => Err(RejectReason::DrawdownLimit),
        };
        let by_ladder = || match self.config.risk_by_probability(probability) {
            r if r > 0.0 => Ok(r),
            _ => Err(RejectReason::LowProbability),
        };
        match self.policy {
            RiskPolicy::Drawdown => by_drawdown(),
            RiskPolicy::ProbabilityLadder => by_ladder(),
            RiskPolicy::Combined => {
                let dd_risk = by_drawdown()?;
                if current_dd >= self.config.dd_soft {
                    Ok(dd_risk)
                } else {
                    by_ladder()
                }
            }
        }
    }

    pub fn assess(
        &self,
        equity: f64,
        entry: f64,
        stop: f64,
        take_profit: f64,
        probability: f64,
        current_dd: f64,
    ) -> Result<TradePlan, RejectReason> {
        if !equity.is_finite() || equity <= 0.0 {
            return Err(RejectReason::DrawdownLimit);
        }
        let risk_pct = self.risk_pct(probability, current_dd)?;
        let size = position_size(equity, risk_pct, entry, stop);
        if size <= 0.0 || !take_profit.is_finite() {
            return Err(RejectReason::InvalidTradeGeometry);
        }
        Ok(TradePlan {
            entry,
            stop,
            take_profit,
            position_size: size,
            risk_pct,
            probability,
        })
    }

    /// Sized plan, or `None` for "do not trade".
    pub fn build_trade(
        &self,
        equity: f64,
        entry: f64,
        stop: f64,
        take_profit: f64,
        probability: f64,
        current_dd: f64,
    ) -> Option<TradePlan> {
        self.assess(equity, entry, stop, take_profit, probability, current_dd)
            .ok()
    }

    /// Attach a plan to an actionable signal, or downgrade it to HOLD.
    pub fn enrich(&self, signal: Signal, equity: f64, current_dd: f64) -> Decision {
        if signal.kind == SignalKind::Hold {
            return Decision { signal, plan: None };
        }
        let outcome = match (signal.entry, signal.stop, signal.take_profit) {
            (Some(entry), Some(stop), Some(tp)) => {
                self.assess(equity, entry, stop, tp, signal.probability, current_dd)
            }
            _ => Err(RejectReason::InvalidTradeGeometry),
        };
        match outcome {
            Ok(plan) => Decision {
                signal,
                plan: Some(plan),
            },
            Err(reason) => {
                debug!(kind = %signal.kind, %reason, equity, current_dd, "trade rejected");
                Decision {
                    signal: signal.into_hold(reason.hold_reason()),
                    plan: None,
                }
            }
        }
    }
}
