//! Technical indicator implementations.
//!
//! Every calculator returns a series with one point per input bar. Points
//! inside the warmup window are marked invalid and carry a zero payload;
//! callers turn them into NaN through the accessor helpers below.
//!
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters
//! - `IndicatorSeries`: A time series of indicator values

pub mod adx;
pub mod atr;
pub mod ema;
pub mod macd;
pub mod sma;
pub mod stochastic;

pub use adx::calculate_adx;
pub use atr::calculate_atr;
pub use ema::calculate_ema;
pub use macd::calculate_macd;
pub use sma::{calculate_sma, calculate_volume_sma};
pub use stochastic::calculate_stochastic;

use chrono::NaiveDate;
use std::fmt;

use crate::domain::ohlcv::OhlcvBar;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Stochastic {
        k: f64,
        d: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    VolumeSma(usize),
    Ema(usize),
    Atr(usize),
    Adx(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Stochastic {
        n: usize,
        smooth_k: usize,
        smooth_d: usize,
    },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

/// MACD components as NaN-marked vectors.
#[derive(Debug, Clone, Default)]
pub struct MacdLines {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl IndicatorSeries {
    /// A series of `bars.len()` invalid points.
    pub(crate) fn warmup_only(indicator_type: IndicatorType, bars: &[OhlcvBar]) -> Self {
        let empty = match indicator_type {
            IndicatorType::Macd { .. } => IndicatorValue::Macd {
                line: 0.0,
                signal: 0.0,
                histogram: 0.0,
            },
            IndicatorType::Stochastic { .. } => IndicatorValue::Stochastic { k: 0.0, d: 0.0 },
            _ => IndicatorValue::Simple(0.0),
        };
        IndicatorSeries {
            indicator_type,
            values: bars
                .iter()
                .map(|bar| IndicatorPoint {
                    date: bar.date,
                    valid: false,
                    value: empty.clone(),
                })
                .collect(),
        }
    }

    /// Single-valued series as `f64`, NaN where invalid.
    pub fn simple_values(&self) -> Vec<f64> {
        self.values
            .iter()
            .map(|p| match (p.valid, &p.value) {
                (true, IndicatorValue::Simple(v)) => *v,
                _ => f64::NAN,
            })
            .collect()
    }

    /// Stochastic (K, D) as `f64`, NaN where invalid.
    pub fn stochastic_values(&self) -> (Vec<f64>, Vec<f64>) {
        self.values
            .iter()
            .map(|p| match (p.valid, &p.value) {
                (true, IndicatorValue::Stochastic { k, d }) => (*k, *d),
                _ => (f64::NAN, f64::NAN),
            })
            .unzip()
    }

    pub fn macd_values(&self) -> MacdLines {
        let mut lines = MacdLines::default();
        for p in &self.values {
            let (l, s, h) = match (p.valid, &p.value) {
                (
                    true,
                    IndicatorValue::Macd {
                        line,
                        signal,
                        histogram,
                    },
                ) => (*line, *signal, *histogram),
                _ => (f64::NAN, f64::NAN, f64::NAN),
            };
            lines.line.push(l);
            lines.signal.push(s);
            lines.histogram.push(h);
        }
        lines
    }
}

/// Trailing simple mean over `period` values, NaN until the window fills.
///
/// A window containing NaN yields NaN.
pub(crate) fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }
    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        out[i] = window.iter().sum::<f64>() / period as f64;
    }
    out
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::VolumeSma(period) => write!(f, "VOLSMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Adx(period) => write!(f, "ADX({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Stochastic {
                n,
                smooth_k,
                smooth_d,
            } => write!(f, "KD({},{},{})", n, smooth_k, smooth_d),
        }
    }
}
