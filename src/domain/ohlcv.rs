//! Daily OHLCV bar representation.

use chrono::NaiveDate;

use super::error::SeriesError;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl OhlcvBar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// Checks that dates strictly increase and prices are finite.
pub fn validate_series(bars: &[OhlcvBar]) -> Result<(), SeriesError> {
    for (index, bar) in bars.iter().enumerate() {
        let prices = [bar.open, bar.high, bar.low, bar.close];
        if prices.iter().any(|p| !p.is_finite()) {
            return Err(SeriesError::NonFinite {
                index,
                date: bar.date,
            });
        }
        if index > 0 && bar.date <= bars[index - 1].date {
            return Err(SeriesError::OutOfOrder {
                index,
                date: bar.date,
            });
        }
    }
    Ok(())
}
