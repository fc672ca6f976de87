//! Report output port.

use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TraderError;
use crate::domain::portfolio::EquityPoint;

pub trait ReportPort {
    fn write_equity_curve(&self, curve: &[EquityPoint], output: &Path) -> Result<(), TraderError>;

    /// Default implementation: writes only the equity curve.
    fn write_result(&self, result: &BacktestResult, output: &Path) -> Result<(), TraderError> {
        self.write_equity_curve(&result.equity_curve, output)
    }
}
