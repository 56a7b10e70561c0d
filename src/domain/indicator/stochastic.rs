//! Stochastic oscillator (KD).
//!
//! raw %K = 100 * (C - LL(n)) / (HH(n) - LL(n)), undefined when the range is
//! zero, which leaves K and D undefined until the flat window rolls out.
//! K = SMA(smooth_k) of raw %K, D = SMA(smooth_d) of K.
//! A point is valid once both K and D exist: n + smooth_k + smooth_d - 2 bars.

use crate::domain::indicator::{
    rolling_mean, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_stochastic(
    bars: &[OhlcvBar],
    n: usize,
    smooth_k: usize,
    smooth_d: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Stochastic {
        n,
        smooth_k,
        smooth_d,
    };
    if n == 0 || smooth_k == 0 || smooth_d == 0 {
        return IndicatorSeries::warmup_only(indicator_type, bars);
    }

    let mut raw_k = vec![f64::NAN; bars.len()];
    for i in (n.saturating_sub(1))..bars.len() {
        let window = &bars[i + 1 - n..=i];
        let lowest = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let highest = window
            .iter()
            .map(|b| b.high)
            .fold(f64::NEG_INFINITY, f64::max);
        let range = highest - lowest;
        if range > 0.0 {
            raw_k[i] = 100.0 * (bars[i].close - lowest) / range;
        }
    }

    let k = rolling_mean(&raw_k, smooth_k);
    let d = rolling_mean(&k, smooth_d);

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let valid = !k[i].is_nan() && !d[i].is_nan();
            IndicatorPoint {
                date: bar.date,
                valid,
                value: if valid {
                    IndicatorValue::Stochastic { k: k[i], d: d[i] }
                } else {
                    IndicatorValue::Stochastic { k: 0.0, d: 0.0 }
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}
