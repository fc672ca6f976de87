//! Performance metrics over simulator output.

use super::portfolio::EquityPoint;
use super::position::ClosedTrade;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Equity-curve statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    /// Share of positive bar returns among the non-zero ones.
    pub win_rate: f64,
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough decline as a fraction of the peak.
    pub max_drawdown: f64,
    /// Longest run of bars below a previous peak.
    pub max_drawdown_duration: usize,
}

impl PerformanceMetrics {
    pub fn compute(equity_curve: &[EquityPoint]) -> Self {
        let total_return = match (equity_curve.first(), equity_curve.last()) {
            (Some(first), Some(last)) if first.equity > 0.0 => {
                (last.equity - first.equity) / first.equity
            }
            _ => 0.0,
        };

        let returns = bar_returns(equity_curve);
        let nonzero = returns.iter().filter(|r| **r != 0.0).count();
        let win_rate = if nonzero > 0 {
            returns.iter().filter(|r| **r > 0.0).count() as f64 / nonzero as f64
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity_curve);

        PerformanceMetrics {
            total_return,
            win_rate,
            sharpe_ratio: compute_sharpe(&returns),
            max_drawdown,
            max_drawdown_duration,
        }
    }
}

fn bar_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            let curr = w[1].equity;
            if prev > 0.0 {
                (curr - prev) / prev
            } else {
                0.0
            }
        })
        .collect()
}

fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut current_duration = 0usize;
    let mut max_duration = 0usize;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            current_duration = 0;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
            current_duration += 1;
            max_duration = max_duration.max(current_duration);
        }
    }

    (max_dd, max_duration)
}

/// Annualised with √252; zero without variation.
fn compute_sharpe(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    if stddev > 0.0 {
        mean / stddev * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    }
}

/// Per-trade statistics. Works on any pnl unit (currency or R multiples).
#[derive(Debug, Clone, PartialEq)]
pub struct TradeMetrics {
    pub total_trades: usize,
    /// Gross profit over gross loss; infinite without losses.
    pub profit_factor: f64,
    pub expectancy: f64,
    pub net_pnl: f64,
    /// 0 (worst) to 100 (best).
    pub risk_score: u8,
}

impl TradeMetrics {
    pub fn compute(trades: &[ClosedTrade]) -> Self {
        let pnls: Vec<f64> = trades.iter().map(|t| t.pnl).collect();
        Self::from_pnls(&pnls)
    }

    pub fn from_pnls(pnls: &[f64]) -> Self {
        TradeMetrics {
            total_trades: pnls.len(),
            profit_factor: profit_factor(pnls),
            expectancy: expectancy(pnls),
            net_pnl: pnls.iter().sum(),
            risk_score: risk_score(pnls),
        }
    }
}

pub fn profit_factor(pnls: &[f64]) -> f64 {
    let gains: f64 = pnls.iter().filter(|p| **p > 0.0).sum();
    let losses: f64 = pnls.iter().filter(|p| **p < 0.0).map(|p| p.abs()).sum();
    if losses > 0.0 {
        gains / losses
    } else {
        f64::INFINITY
    }
}

/// win_rate · avg_win − loss_rate · avg_loss
pub fn expectancy(pnls: &[f64]) -> f64 {
    if pnls.is_empty() {
        return 0.0;
    }
    let n = pnls.len() as f64;
    let wins: Vec<f64> = pnls.iter().copied().filter(|p| *p > 0.0).collect();
    let losses: Vec<f64> = pnls.iter().filter(|p| **p < 0.0).map(|p| p.abs()).collect();
    let mean = |v: &[f64]| {
        if v.is_empty() {
            0.0
        } else {
            v.iter().sum::<f64>() / v.len() as f64
        }
    };
    (wins.len() as f64 / n) * mean(&wins) - (losses.len() as f64 / n) * mean(&losses)
}

/// Up to 40 points for profit factor (saturating at 3), up to 40 for
/// expectancy (saturating at 100), minus up to 20 for the cumulative pnl
/// drawdown (saturating at 1000).
pub fn risk_score(pnls: &[f64]) -> u8 {
    if pnls.is_empty() {
        return 0;
    }
    let mut cumulative = 0.0_f64;
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for pnl in pnls {
        cumulative += pnl;
        peak = peak.max(cumulative);
        max_dd = max_dd.max(peak - cumulative);
    }

    let pf_score = (profit_factor(pnls) / 3.0).min(1.0) * 40.0;
    let exp_score = (expectancy(pnls).max(0.0) / 100.0).min(1.0) * 40.0;
    let dd_penalty = (max_dd / 1000.0).min(1.0) * 20.0;

    (pf_score + exp_score - dd_penalty).clamp(0.0, 100.0) as u8
}
