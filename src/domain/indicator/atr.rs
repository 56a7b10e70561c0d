//! Average True Range (Wilder).
//!
//! TR[0] = high - low, TR[i] = max(H-L, |H-Cprev|, |L-Cprev|).
//! Seed with the mean of the first n TRs, then ATR[i] = (ATR[i-1]*(n-1) + TR[i]) / n.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_atr(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if bars.len() < period || period == 0 {
        return IndicatorSeries::warmup_only(IndicatorType::Atr(period), bars);
    }

    let tr_values = true_ranges(bars);
    let mut results: Vec<IndicatorPoint> = Vec::with_capacity(bars.len());
    let mut atr = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if i + 1 < period {
            results.push(IndicatorPoint {
                date: bar.date,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            });
            continue;
        }
        atr = if i + 1 == period {
            tr_values[0..=i].iter().sum::<f64>() / period as f64
        } else {
            (atr * (period - 1) as f64 + tr_values[i]) / period as f64
        };
        results.push(IndicatorPoint {
            date: bar.date,
            valid: true,
            value: IndicatorValue::Simple(atr),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values: results,
    }
}

pub(crate) fn true_ranges(bars: &[OhlcvBar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect()
}
