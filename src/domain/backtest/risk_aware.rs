use std::collections::HashMap;

use tracing::{debug, info};

use super::{BacktestConfig, BacktestResult, Simulator, SimulatorKind};
use crate::domain::bar::Bar;
use crate::domain::error::TraderError;
use crate::domain::portfolio::Portfolio;
use crate::domain::position::{ExitReason, Position, Side};
use crate::domain::risk::{RiskManager, TradePlan};
use crate::domain::signal::{HoldReason, Signal, SignalKind};
use crate::domain::signal_engine::SignalEngine;

/// Replay of precomputed signals and trade plans, long only.
///
/// A BUY with a plan opens at the plan's levels. While in position, the next
/// bar's close is compared with the stop first and the target second; the
/// crossed level is the exit price.
#[derive(Debug)]
pub struct RiskAwareSimulator<'a> {
    engine: &'a SignalEngine,
    risk: RiskManager,
    config: BacktestConfig,
}

impl<'a> RiskAwareSimulator<'a> {
    pub fn new(engine: &'a SignalEngine, risk: RiskManager, config: BacktestConfig) -> Self {
        RiskAwareSimulator {
            engine,
            risk,
            config,
        }
    }

    /// Signals on causal windows for every bar, and plans for the BUY bars
    /// sized from the initial equity with no drawdown. Bars inside the warm-up
    /// get a warm-up HOLD.
    pub fn precompute(&self, series: &[Bar]) -> (Vec<Signal>, HashMap<usize, TradePlan>) {
        let mut plans = HashMap::new();
        let signals = (0..series.len())
            .map(|i| {
                if i < self.config.warmup {
                    return Signal::hold(HoldReason::Warmup);
                }
                let signal = self.engine.generate(&series[..=i]);
                if signal.kind == SignalKind::Buy {
                    let plan = match (signal.entry, signal.stop, signal.take_profit) {
                        (Some(entry), Some(stop), Some(tp)) => self.risk.build_trade(
                            self.config.initial_equity,
                            entry,
                            stop,
                            tp,
                            signal.probability,
                            0.0,
                        ),
                        _ => None,
                    };
                    match plan {
                        Some(plan) => {
                            plans.insert(i, plan);
                        }
                        None => debug!(bar = i, "BUY without a trade plan"),
                    }
                }
                signal
            })
            .collect();
        (signals, plans)
    }

    /// Walk `start..len-1` where `start` is the warm-up offset. A single bar
    /// after the warm-up has no next bar to check, so the result is empty.
    pub fn replay(
        &self,
        series: &[Bar],
        signals: &[Signal],
        plans: &HashMap<usize, TradePlan>,
    ) -> Result<BacktestResult, TraderError> {
        let warmup = self.config.warmup;
        if series.len() <= warmup {
            return Err(TraderError::InsufficientData {
                bars: series.len(),
                minimum: warmup,
            });
        }

        let mut portfolio = Portfolio::new(self.config.initial_equity);

        for i in warmup..series.len() - 1 {
            let bar = &series[i];
            let next = &series[i + 1];

            let is_buy = signals.get(i).is_some_and(|s| s.kind == SignalKind::Buy);
            let plan = if portfolio.is_flat() && is_buy { plans.get(&i) } else { None };
            if let Some(plan) = plan {
                let opened = portfolio.open(Position {
                    side: Side::Long,
                    entry: plan.entry,
                    size: plan.position_size,
                    stop: plan.stop,
                    take_profit: Some(plan.take_profit),
                    opened_at: bar.timestamp,
                });
                if opened {
                    info!(
                        entry = plan.entry,
                        size = plan.position_size,
                        stop = plan.stop,
                        take_profit = plan.take_profit,
                        at = %bar.timestamp,
                        "position opened"
                    );
                }
            }

            let exit = portfolio.position().and_then(|pos| {
                if next.close <= pos.stop {
                    Some((pos.stop, ExitReason::StopLoss))
                } else if pos.should_take_profit(next.close) {
                    pos.take_profit.map(|tp| (tp, ExitReason::TakeProfit))
                } else {
                    None
                }
            });
            if let Some((level, reason)) = exit {
                if let Some(trade) = portfolio.close(level, next.timestamp, reason) {
                    info!(
                        %reason,
                        exit = trade.exit,
                        pnl = trade.pnl,
                        at = %next.timestamp,
                        "position closed"
                    );
                }
            }

            portfolio.record_equity(bar.timestamp, bar.close);
        }

        Ok(BacktestResult {
            initial_equity: portfolio.initial_equity,
            final_equity: portfolio.equity,
            equity_curve: portfolio.equity_curve,
            trades: portfolio.closed_trades,
        })
    }
}

impl Simulator for RiskAwareSimulator<'_> {
    fn kind(&self) -> SimulatorKind {
        SimulatorKind::RiskAware
    }

    fn run(&self, series: &[Bar]) -> Result<BacktestResult, TraderError> {
        let (signals, plans) = self.precompute(series);
        self.replay(series, &signals, &plans)
    }
}
