//! Backtest simulators and batch runs.
//!
//! Two replay strategies share the [`Simulator`] interface and are chosen
//! explicitly through [`SimulatorKind`]:
//!
//! - [`StopOnlySimulator`]: bar-by-bar signals with running equity and
//!   drawdown, exits on the stop only, realized at the bar's close.
//! - [`RiskAwareSimulator`]: precomputed signals and trade plans, exits on the
//!   next bar's close crossing stop or target, realized at that level.
//!
//! Within a run every step depends on the previous one. Independent runs can
//! go in parallel through [`run_batch`].

mod risk_aware;
mod stop_only;

pub use risk_aware::RiskAwareSimulator;
pub use stop_only::StopOnlySimulator;

use std::fmt;
use std::str::FromStr;

use tracing::{error, warn};

use super::bar::Bar;
use super::error::TraderError;
use super::portfolio::EquityPoint;
use super::position::ClosedTrade;
use super::risk::RiskManager;
use super::signal_engine::SignalEngine;

pub const DEFAULT_WARMUP: usize = 100;
pub const MIN_WARMUP: usize = 100;
pub const DEFAULT_INITIAL_EQUITY: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestConfig {
    pub initial_equity: f64,
    /// Bars skipped before the first decision.
    pub warmup: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_equity: DEFAULT_INITIAL_EQUITY,
            warmup: DEFAULT_WARMUP,
        }
    }
}

impl BacktestConfig {
    /// Warm-up below the minimum is raised to it.
    pub fn new(initial_equity: f64, warmup: usize) -> Self {
        let warmup = if warmup < MIN_WARMUP {
            warn!(warmup, minimum = MIN_WARMUP, "warm-up too short, raised to minimum");
            MIN_WARMUP
        } else {
            warmup
        };
        BacktestConfig {
            initial_equity,
            warmup,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub initial_equity: f64,
    pub final_equity: f64,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<ClosedTrade>,
}

impl BacktestResult {
    pub fn total_return(&self) -> f64 {
        if self.initial_equity == 0.0 {
            return 0.0;
        }
        (self.final_equity - self.initial_equity) / self.initial_equity
    }
}

pub trait Simulator: Send + Sync {
    fn kind(&self) -> SimulatorKind;

    /// Replay `series` and return one equity point per processed bar.
    /// Fails only when no bars remain after the warm-up.
    fn run(&self, series: &[Bar]) -> Result<BacktestResult, TraderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulatorKind {
    StopOnly,
    RiskAware,
}

impl SimulatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimulatorKind::StopOnly => "stop-only",
            SimulatorKind::RiskAware => "risk-aware",
        }
    }

    /// Build the simulator for this strategy around a shared engine.
    pub fn build<'a>(
        &self,
        engine: &'a SignalEngine,
        risk: RiskManager,
        config: BacktestConfig,
    ) -> Box<dyn Simulator + 'a> {
        match self {
            SimulatorKind::StopOnly => Box::new(StopOnlySimulator::new(engine, risk, config)),
            SimulatorKind::RiskAware => Box::new(RiskAwareSimulator::new(engine, risk, config)),
        }
    }
}

impl fmt::Display for SimulatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimulatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "stop-only" | "stop" => Ok(SimulatorKind::StopOnly),
            "risk-aware" | "risk" => Ok(SimulatorKind::RiskAware),
            other => Err(format!(
                "unknown simulator '{other}', expected stop-only or risk-aware"
            )),
        }
    }
}

/// One named series for [`run_batch`].
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub label: String,
    pub series: Vec<Bar>,
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub label: String,
    pub result: Result<BacktestResult, TraderError>,
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run every job on its own thread. Outcomes keep job order; an error or
/// panic in one run is reported for that job only.
pub fn run_batch(simulator: &dyn Simulator, jobs: &[BatchJob]) -> Vec<BatchOutcome> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = jobs
            .iter()
            .map(|job| (job, scope.spawn(move || simulator.run(&job.series))))
            .collect();

        handles
            .into_iter()
            .map(|(job, handle)| {
                let result = match handle.join() {
                    Ok(result) => result,
                    Err(payload) => {
                        let reason = panic_message(payload.as_ref());
                        error!(label = %job.label, %reason, "simulator run panicked");
                        Err(TraderError::RunPanicked {
                            label: job.label.clone(),
                            reason,
                        })
                    }
                };
                if let Err(e) = &result {
                    warn!(label = %job.label, error = %e, "batch run failed");
                }
                BatchOutcome {
                    label: job.label.clone(),
                    result,
                }
            })
            .collect()
    })
}
