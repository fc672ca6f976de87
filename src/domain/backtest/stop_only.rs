use tracing::{debug, info};

use super::{BacktestConfig, BacktestResult, Simulator, SimulatorKind};
use crate::domain::bar::Bar;
use crate::domain::error::TraderError;
use crate::domain::portfolio::Portfolio;
use crate::domain::position::{ExitReason, Position, Side};
use crate::domain::risk::{RiskManager, RiskPolicy};
use crate::domain::signal::SignalKind;
use crate::domain::signal_engine::SignalEngine;

/// Causal bar-by-bar replay with stop-only exits.
///
/// Each bar sees only the bars up to and including itself. Signals are sized
/// with the drawdown policy from the running equity and peak-to-current
/// drawdown. A position opens at the bar's close; from the next bar on it
/// closes at the close of the first bar that crosses the stop. Targets are not
/// checked.
#[derive(Debug)]
pub struct StopOnlySimulator<'a> {
    engine: &'a SignalEngine,
    risk: RiskManager,
    config: BacktestConfig,
}

impl<'a> StopOnlySimulator<'a> {
    pub fn new(engine: &'a SignalEngine, risk: RiskManager, config: BacktestConfig) -> Self {
        StopOnlySimulator {
            engine,
            risk: risk.with_policy(RiskPolicy::Drawdown),
            config,
        }
    }
}

impl Simulator for StopOnlySimulator<'_> {
    fn kind(&self) -> SimulatorKind {
        SimulatorKind::StopOnly
    }

    fn run(&self, series: &[Bar]) -> Result<BacktestResult, TraderError> {
        let warmup = self.config.warmup;
        if series.len() <= warmup {
            return Err(TraderError::InsufficientData {
                bars: series.len(),
                minimum: warmup,
            });
        }

        let mut portfolio = Portfolio::new(self.config.initial_equity);

        for (i, bar) in series.iter().enumerate().skip(warmup) {
            let price = bar.close;
            let signal = self.engine.generate(&series[..=i]);
            let decision = self
                .risk
                .enrich(signal, portfolio.equity, portfolio.drawdown());

            match portfolio.position() {
                None => {
                    let side = match decision.signal.kind {
                        SignalKind::Buy => Some(Side::Long),
                        SignalKind::Sell => Some(Side::Short),
                        SignalKind::Hold => None,
                    };
                    if let (Some(side), Some(plan)) = (side, decision.plan) {
                        let opened = portfolio.open(Position {
                            side,
                            entry: price,
                            size: plan.position_size,
                            stop: plan.stop,
                            take_profit: Some(plan.take_profit),
                            opened_at: bar.timestamp,
                        });
                        if opened {
                            info!(
                                %side,
                                entry = price,
                                size = plan.position_size,
                                stop = plan.stop,
                                at = %bar.timestamp,
                                "position opened"
                            );
                        }
                    } else if let Some(reason) = decision.signal.reason {
                        debug!(bar = i, %reason, "no entry");
                    }
                }
                Some(position) if position.should_stop_loss(price) => {
                    if let Some(trade) = portfolio.close(price, bar.timestamp, ExitReason::StopLoss) {
                        info!(
                            side = %trade.side,
                            exit = trade.exit,
                            pnl = trade.pnl,
                            at = %bar.timestamp,
                            "stop hit"
                        );
                    }
                }
                Some(_) => {}
            }

            portfolio.record_equity(bar.timestamp, price);
        }

        Ok(BacktestResult {
            initial_equity: portfolio.initial_equity,
            final_equity: portfolio.equity,
            equity_curve: portfolio.equity_curve,
            trades: portfolio.closed_trades,
        })
    }
}
