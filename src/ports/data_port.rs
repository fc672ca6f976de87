//! Data access port.

use crate::domain::error::TraderError;
use crate::domain::ohlcv::OhlcvBar;

pub trait DataPort {
    /// Candles for `symbol` at `timeframe`, oldest first.
    fn fetch_bars(&self, symbol: &str, timeframe: &str) -> Result<Vec<OhlcvBar>, TraderError>;

    fn list_symbols(&self, timeframe: &str) -> Result<Vec<String>, TraderError>;
}
