//! Configuration loading and validation.
//!
//! Out-of-range numeric parameters are clamped with a warning. Only
//! structurally unusable configuration is an error: missing or malformed model
//! weights, a non-positive initial equity, empty walk-forward folds.

use tracing::warn;

use super::backtest::{BacktestConfig, DEFAULT_INITIAL_EQUITY, DEFAULT_WARMUP};
use super::error::TraderError;
use super::market_state::{MarketStateDetector, TrendStateDetector, DEAD_ATR_RELATIVE};
use super::model::LogisticModel;
use super::risk::{RiskConfig, RiskPolicy};
use super::signal_engine::{SignalEngine, DEFAULT_THRESHOLD};
use super::walkforward::{WalkForwardConfig, DEFAULT_TEST_SIZE, DEFAULT_TRAIN_SIZE};
use crate::ports::config_port::ConfigPort;

pub fn load_threshold(config: &dyn ConfigPort) -> f64 {
    config.get_double("signal", "threshold", DEFAULT_THRESHOLD)
}

/// `[signal] market_state = false` disables market-state gating.
pub fn load_market_state_detector(config: &dyn ConfigPort) -> Option<Box<dyn MarketStateDetector>> {
    if !config.get_bool("signal", "market_state", true) {
        return None;
    }
    let floor = config.get_double("signal", "dead_atr_relative", DEAD_ATR_RELATIVE);
    Some(Box::new(TrendStateDetector::new(floor)))
}

pub fn load_risk_config(config: &dyn ConfigPort) -> RiskConfig {
    let d = RiskConfig::default();
    RiskConfig {
        base_risk: config.get_double("risk", "base_risk", d.base_risk),
        max_risk: config.get_double("risk", "max_risk", d.max_risk),
        min_probability: config.get_double("risk", "min_probability", d.min_probability),
        dd_soft: config.get_double("risk", "dd_soft", d.dd_soft),
        dd_hard: config.get_double("risk", "dd_hard", d.dd_hard),
        base_risk_pct: config.get_double("risk", "base_risk_pct", d.base_risk_pct),
        min_risk_pct: config.get_double("risk", "min_risk_pct", d.min_risk_pct),
        r_target: config.get_double("risk", "r_target", d.r_target),
    }
    .sanitized()
}

pub fn load_risk_policy(config: &dyn ConfigPort) -> RiskPolicy {
    match config.get_string("risk", "policy") {
        None => RiskPolicy::default(),
        Some(name) => RiskPolicy::from_name(&name).unwrap_or_else(|| {
            warn!(policy = %name, "unknown risk policy, using combined");
            RiskPolicy::default()
        }),
    }
}

pub fn load_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, TraderError> {
    let initial_equity = config.get_double("backtest", "initial_equity", DEFAULT_INITIAL_EQUITY);
    if !initial_equity.is_finite() || initial_equity <= 0.0 {
        return Err(TraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "initial_equity".to_string(),
            reason: "initial_equity must be positive".to_string(),
        });
    }
    let warmup = config.get_int("backtest", "warmup", DEFAULT_WARMUP as i64);
    Ok(BacktestConfig::new(
        initial_equity,
        usize::try_from(warmup).unwrap_or(0),
    ))
}

pub fn load_walk_forward_config(config: &dyn ConfigPort) -> Result<WalkForwardConfig, TraderError> {
    let size = |key: &str, default: usize| -> Result<usize, TraderError> {
        let value = config.get_int("walk_forward", key, default as i64);
        match usize::try_from(value) {
            Ok(v) if v > 0 => Ok(v),
            _ => Err(TraderError::ConfigInvalid {
                section: "walk_forward".to_string(),
                key: key.to_string(),
                reason: format!("{key} must be a positive integer"),
            }),
        }
    };
    Ok(WalkForwardConfig {
        train_size: size("train_size", DEFAULT_TRAIN_SIZE)?,
        test_size: size("test_size", DEFAULT_TEST_SIZE)?,
    })
}

fn required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, TraderError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(TraderError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// `[model]` with comma-separated `features` and `weights`, and `intercept`.
pub fn load_model(config: &dyn ConfigPort) -> Result<LogisticModel, TraderError> {
    let features: Vec<String> = split_list(&required(config, "model", "features")?)
        .map(str::to_string)
        .collect();
    let weights = split_list(&required(config, "model", "weights")?)
        .map(|w| {
            w.parse::<f64>().map_err(|_| TraderError::ConfigInvalid {
                section: "model".to_string(),
                key: "weights".to_string(),
                reason: format!("'{w}' is not a number"),
            })
        })
        .collect::<Result<Vec<f64>, _>>()?;
    let intercept = config.get_double("model", "intercept", 0.0);
    LogisticModel::new(features, weights, intercept)
}

/// Engine wired from `[signal]` and `[model]`.
pub fn build_engine(config: &dyn ConfigPort) -> Result<SignalEngine, TraderError> {
    let model = load_model(config)?;
    Ok(SignalEngine::new(
        Box::new(model),
        load_threshold(config),
        load_market_state_detector(config),
    ))
}
