//! Institutional net-flow alignment and rolling sums.

use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Daily net institutional flow for one instrument, keyed by date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstFlow {
    pub daily: BTreeMap<NaiveDate, f64>,
}

impl InstFlow {
    pub fn new(daily: BTreeMap<NaiveDate, f64>) -> Self {
        Self { daily }
    }

    /// One value per date; days without a record count as zero.
    pub fn align(&self, dates: &[NaiveDate]) -> Vec<f64> {
        dates
            .iter()
            .map(|d| self.daily.get(d).copied().unwrap_or(0.0))
            .collect()
    }

    /// Sum over the trailing `lookback` dates ending at each position.
    pub fn rolling_sums(&self, dates: &[NaiveDate], lookback: usize) -> Vec<Option<f64>> {
        rolling_sum(&self.align(dates), lookback)
    }
}

pub fn rolling_sum(values: &[f64], lookback: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if lookback == 0 {
        return out;
    }
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= lookback {
            sum -= values[i - lookback];
        }
        if i + 1 >= lookback {
            out[i] = Some(sum);
        }
    }
    out
}
