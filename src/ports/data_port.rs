//! Price data access port trait.

use crate::domain::error::TwscanError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Daily bars for `code`, date ascending, bounded by the optional
    /// inclusive date range.
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, TwscanError>;

    fn list_symbols(&self) -> Result<Vec<String>, TwscanError>;

    /// First date, last date and bar count, or `None` when nothing is stored.
    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TwscanError>;
}
