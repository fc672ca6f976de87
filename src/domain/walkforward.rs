//! Walk-forward validation of the signal engine.
//!
//! The series is cut into consecutive folds of `train_size` bars followed by
//! `test_size` bars, advancing by `test_size`. Every test bar gets a signal
//! from the bars up to and including it; actionable signals are resolved
//! against the bars that follow.

use tracing::info;

use super::bar::Bar;
use super::error::TraderError;
use super::execution::{resolve_trade, TradeOutcome};
use super::metrics::expectancy;
use super::signal_engine::SignalEngine;

pub const DEFAULT_TRAIN_SIZE: usize = 1000;
pub const DEFAULT_TEST_SIZE: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkForwardConfig {
    pub train_size: usize,
    pub test_size: usize,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        WalkForwardConfig {
            train_size: DEFAULT_TRAIN_SIZE,
            test_size: DEFAULT_TEST_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FoldReport {
    /// First bar of the training span.
    pub start: usize,
    pub test_start: usize,
    pub test_end: usize,
    /// Actionable signals in the test span.
    pub signals: usize,
    /// Signals whose stop or target was reached.
    pub trades: Vec<TradeOutcome>,
    /// Mean outcome in R multiples.
    pub expectancy: f64,
}

impl FoldReport {
    pub fn win_rate(&self) -> f64 {
        if self.trades.is_empty() {
            return 0.0;
        }
        self.trades.iter().filter(|t| t.win).count() as f64 / self.trades.len() as f64
    }
}

pub fn walk_forward(
    engine: &SignalEngine,
    bars: &[Bar],
    config: WalkForwardConfig,
) -> Result<Vec<FoldReport>, TraderError> {
    let WalkForwardConfig {
        train_size,
        test_size,
    } = config;
    if train_size == 0 || test_size == 0 {
        return Err(TraderError::ConfigInvalid {
            section: "walk_forward".to_string(),
            key: if train_size == 0 { "train_size" } else { "test_size" }.to_string(),
            reason: "fold sizes must be positive".to_string(),
        });
    }
    if bars.len() <= train_size + test_size {
        return Err(TraderError::InsufficientData {
            bars: bars.len(),
            minimum: train_size + test_size,
        });
    }

    let mut folds = Vec::new();
    let mut start = 0;
    while start + train_size + test_size < bars.len() {
        let test_start = start + train_size;
        let test_end = test_start + test_size;

        let mut signals = 0;
        let mut trades = Vec::new();
        for k in test_start..test_end {
            let signal = engine.generate(&bars[..=k]);
            if !signal.kind.is_actionable() {
                continue;
            }
            signals += 1;
            if let Some(outcome) = resolve_trade(&signal, bars, k) {
                trades.push(outcome);
            }
        }

        let r_multiples: Vec<f64> = trades.iter().map(|t| t.r_multiple).collect();
        let fold = FoldReport {
            start,
            test_start,
            test_end,
            signals,
            expectancy: expectancy(&r_multiples),
            trades,
        };
        info!(
            start,
            signals = fold.signals,
            trades = fold.trades.len(),
            expectancy = fold.expectancy,
            "walk-forward fold"
        );
        folds.push(fold);
        start += test_size;
    }

    Ok(folds)
}
