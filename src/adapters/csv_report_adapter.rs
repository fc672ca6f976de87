//! CSV report adapter implementing ReportPort.
//!
//! The equity curve is written one row per bar. `write_result` also writes the
//! closed trades next to it, as `<stem>_trades.csv`.

use std::path::{Path, PathBuf};

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TraderError;
use crate::domain::portfolio::EquityPoint;
use crate::domain::position::ClosedTrade;
use crate::ports::report_port::ReportPort;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        CsvReportAdapter
    }

    pub fn trades_path(output: &Path) -> PathBuf {
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report".to_string());
        output.with_file_name(format!("{}_trades.csv", stem))
    }

    pub fn write_trades(&self, trades: &[ClosedTrade], output: &Path) -> Result<(), TraderError> {
        let mut wtr = writer(output)?;
        write_row(
            &mut wtr,
            &["side", "entry", "exit", "size", "opened_at", "closed_at", "pnl", "exit_reason"],
        )?;
        for t in trades {
            write_row(
                &mut wtr,
                &[
                    t.side.as_str().to_string(),
                    t.entry.to_string(),
                    t.exit.to_string(),
                    t.size.to_string(),
                    t.opened_at.format(TIMESTAMP_FORMAT).to_string(),
                    t.closed_at.format(TIMESTAMP_FORMAT).to_string(),
                    t.pnl.to_string(),
                    t.exit_reason.as_str().to_string(),
                ],
            )?;
        }
        flush(wtr)
    }
}

fn writer(output: &Path) -> Result<csv::Writer<std::fs::File>, TraderError> {
    csv::Writer::from_path(output).map_err(|e| TraderError::Data {
        reason: format!("failed to create {}: {}", output.display(), e),
    })
}

fn write_row<I, T>(wtr: &mut csv::Writer<std::fs::File>, row: I) -> Result<(), TraderError>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    wtr.write_record(row).map_err(|e| TraderError::Data {
        reason: format!("CSV write error: {}", e),
    })
}

fn flush(mut wtr: csv::Writer<std::fs::File>) -> Result<(), TraderError> {
    wtr.flush()?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write_equity_curve(&self, curve: &[EquityPoint], output: &Path) -> Result<(), TraderError> {
        let mut wtr = writer(output)?;
        write_row(&mut wtr, &["timestamp", "equity", "price", "position"])?;
        for point in curve {
            write_row(
                &mut wtr,
                &[
                    point.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    point.equity.to_string(),
                    point.price.to_string(),
                    point.position.map(|s| s.as_str()).unwrap_or("FLAT").to_string(),
                ],
            )?;
        }
        flush(wtr)
    }

    fn write_result(&self, result: &BacktestResult, output: &Path) -> Result<(), TraderError> {
        self.write_equity_curve(&result.equity_curve, output)?;
        self.write_trades(&result.trades, &Self::trades_path(output))
    }
}
