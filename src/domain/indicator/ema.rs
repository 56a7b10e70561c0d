//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seed with the SMA of the first n closes, then
//! EMA[i] = EMA[i-1] + k * (C[i] - EMA[i-1]).
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_ema(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ema = ema_of(&closes, period);

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values: bars
            .iter()
            .zip(ema)
            .map(|(bar, v)| IndicatorPoint {
                date: bar.date,
                valid: !v.is_nan(),
                value: IndicatorValue::Simple(if v.is_nan() { 0.0 } else { v }),
            })
            .collect(),
    }
}

/// EMA over a raw series whose leading values may be NaN.
///
/// The seed is the mean of the first `period` values starting at the first
/// non-NaN entry; everything before the seed is NaN.
pub(crate) fn ema_of(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }
    let Some(start) = values.iter().position(|v| !v.is_nan()) else {
        return out;
    };
    let seed_idx = start + period - 1;
    if seed_idx >= values.len() {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = values[start..=seed_idx].iter().sum::<f64>() / period as f64;
    out[seed_idx] = ema;
    for i in (seed_idx + 1)..values.len() {
        ema += k * (values[i] - ema);
        out[i] = ema;
    }
    out
}
