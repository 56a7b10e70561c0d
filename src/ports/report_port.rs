//! Report output port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::config::ScreenConfig;
use crate::domain::error::TwscanError;
use crate::domain::scan::ScanRecord;

pub trait ReportPort {
    /// Writes the ranked entry candidates and, when `full` is set, every
    /// evaluated record.
    fn write_scan(
        &self,
        records: &[ScanRecord],
        config: &ScreenConfig,
        full: bool,
    ) -> Result<(), TwscanError>;

    /// Writes one summary row per instrument and the combined trade ledger.
    fn write_backtest(&self, results: &[BacktestResult]) -> Result<(), TwscanError>;
}
