//! Single-position account state and equity tracking for one simulator run.
//!
//! Equity moves only when a position closes. The running peak feeds the
//! drawdown the risk manager sees on later bars.

use chrono::NaiveDateTime;

use super::position::{ClosedTrade, ExitReason, Position, Side};

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
    pub price: f64,
    pub position: Option<Side>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub equity: f64,
    pub initial_equity: f64,
    peak: f64,
    position: Option<Position>,
    pub closed_trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_equity: f64) -> Self {
        Portfolio {
            equity: initial_equity,
            initial_equity,
            peak: initial_equity,
            position: None,
            closed_trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    pub fn side(&self) -> Option<Side> {
        self.position.as_ref().map(|p| p.side)
    }

    /// Open `position` when flat and sized. Returns whether it was opened.
    pub fn open(&mut self, position: Position) -> bool {
        if self.position.is_some() || position.size.is_nan() || position.size <= 0.0 {
            return false;
        }
        self.position = Some(position);
        true
    }

    /// Close the open position at `exit`, realizing its pnl into equity.
    pub fn close(
        &mut self,
        exit: f64,
        closed_at: NaiveDateTime,
        reason: ExitReason,
    ) -> Option<&ClosedTrade> {
        let position = self.position.take()?;
        let trade = position.close(exit, closed_at, reason);
        self.equity += trade.pnl;
        if self.equity > self.peak {
            self.peak = self.equity;
        }
        self.closed_trades.push(trade);
        self.closed_trades.last()
    }

    pub fn peak(&self) -> f64 {
        self.peak
    }

    /// Fractional decline of equity from its running peak, in [0, 1] for
    /// non-negative equity.
    pub fn drawdown(&self) -> f64 {
        if self.peak <= 0.0 {
            return 0.0;
        }
        ((self.peak - self.equity) / self.peak).max(0.0)
    }

    pub fn record_equity(&mut self, timestamp: NaiveDateTime, price: f64) {
        self.equity_curve.push(EquityPoint {
            timestamp,
            equity: self.equity,
            price,
            position: self.side(),
        });
    }

    pub fn total_return(&self) -> f64 {
        if self.initial_equity == 0.0 {
            return 0.0;
        }
        (self.equity - self.initial_equity) / self.initial_equity
    }
}
