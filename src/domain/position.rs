//! Open position and closed trade records owned by a simulator run.

use std::fmt;

use chrono::NaiveDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Long => "LONG",
            Side::Short => "SHORT",
        }
    }

    /// +1 for long, -1 for short.
    pub fn sign(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub side: Side,
    pub entry: f64,
    pub size: f64,
    pub stop: f64,
    pub take_profit: Option<f64>,
    pub opened_at: NaiveDateTime,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.side == Side::Long
    }

    pub fn is_short(&self) -> bool {
        self.side == Side::Short
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.side.sign() * (price - self.entry) * self.size
    }

    pub fn should_stop_loss(&self, price: f64) -> bool {
        match self.side {
            Side::Long => price <= self.stop,
            Side::Short => price >= self.stop,
        }
    }

    pub fn should_take_profit(&self, price: f64) -> bool {
        match (self.side, self.take_profit) {
            (_, None) => false,
            (Side::Long, Some(tp)) => price >= tp,
            (Side::Short, Some(tp)) => price <= tp,
        }
    }

    /// Close at `exit`, realizing `(exit - entry) · size` for longs and the
    /// mirror for shorts.
    pub fn close(self, exit: f64, closed_at: NaiveDateTime, reason: ExitReason) -> ClosedTrade {
        ClosedTrade {
            pnl: self.unrealized_pnl(exit),
            side: self.side,
            entry: self.entry,
            exit,
            size: self.size,
            opened_at: self.opened_at,
            closed_at,
            exit_reason: reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub side: Side,
    pub entry: f64,
    pub exit: f64,
    pub size: f64,
    pub opened_at: NaiveDateTime,
    pub closed_at: NaiveDateTime,
    pub pnl: f64,
    pub exit_reason: ExitReason,
}

impl ClosedTrade {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }
}
