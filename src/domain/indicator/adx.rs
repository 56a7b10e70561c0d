//! Average Directional Index (Wilder).
//!
//! +DM/-DM and TR start at bar 1. Their first smoothed value is the plain sum
//! over `n` bars (index n), then S[i] = S[i-1] - S[i-1]/n + X[i].
//! DI = 100 * S(DM) / S(TR), DX = 100 * |+DI - -DI| / (+DI + -DI).
//! ADX seeds with the mean of the first n DX values (index 2n-1), then
//! ADX[i] = (ADX[i-1]*(n-1) + DX[i]) / n.
//!
//! A zero smoothed TR or zero DI sum gives DX = 0 rather than NaN.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_adx(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Adx(period);
    if period == 0 || bars.len() < 2 * period {
        return IndicatorSeries::warmup_only(indicator_type, bars);
    }

    let len = bars.len();
    let mut plus_dm = vec![0.0; len];
    let mut minus_dm = vec![0.0; len];
    let mut tr = vec![0.0; len];
    for i in 1..len {
        let up = bars[i].high - bars[i - 1].high;
        let down = bars[i - 1].low - bars[i].low;
        if up > down && up > 0.0 {
            plus_dm[i] = up;
        }
        if down > up && down > 0.0 {
            minus_dm[i] = down;
        }
        tr[i] = bars[i].true_range(bars[i - 1].close);
    }

    let p = period as f64;
    let mut dx = vec![f64::NAN; len];
    let mut s_plus: f64 = plus_dm[1..=period].iter().sum();
    let mut s_minus: f64 = minus_dm[1..=period].iter().sum();
    let mut s_tr: f64 = tr[1..=period].iter().sum();
    dx[period] = directional_index(s_plus, s_minus, s_tr);
    for i in (period + 1)..len {
        s_plus = s_plus - s_plus / p + plus_dm[i];
        s_minus = s_minus - s_minus / p + minus_dm[i];
        s_tr = s_tr - s_tr / p + tr[i];
        dx[i] = directional_index(s_plus, s_minus, s_tr);
    }

    let first = 2 * period - 1;
    let mut adx = 0.0;
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i < first {
                return IndicatorPoint {
                    date: bar.date,
                    valid: false,
                    value: IndicatorValue::Simple(0.0),
                };
            }
            adx = if i == first {
                dx[period..=first].iter().sum::<f64>() / p
            } else {
                (adx * (p - 1.0) + dx[i]) / p
            };
            IndicatorPoint {
                date: bar.date,
                valid: true,
                value: IndicatorValue::Simple(adx),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

fn directional_index(s_plus: f64, s_minus: f64, s_tr: f64) -> f64 {
    if s_tr <= 0.0 {
        return 0.0;
    }
    let plus_di = 100.0 * s_plus / s_tr;
    let minus_di = 100.0 * s_minus / s_tr;
    let sum = plus_di + minus_di;
    if sum <= 0.0 {
        0.0
    } else {
        100.0 * (plus_di - minus_di).abs() / sum
    }
}
