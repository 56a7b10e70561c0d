//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line, seeded at the first defined line value
//! Histogram = MACD Line - Signal Line
//!
//! Warmup: max(fast, slow) - 1 + signal - 1 bars.

use crate::domain::indicator::ema::ema_of;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(
    bars: &[OhlcvBar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };
    if fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorSeries::warmup_only(indicator_type, bars);
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ema_fast = ema_of(&closes, fast);
    let ema_slow = ema_of(&closes, slow);

    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema_of(&macd_line, signal_period);

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let line = macd_line[i];
            let signal = signal_line[i];
            let valid = !line.is_nan() && !signal.is_nan();
            let value = if valid {
                IndicatorValue::Macd {
                    line,
                    signal,
                    histogram: line - signal,
                }
            } else {
                IndicatorValue::Macd {
                    line: 0.0,
                    signal: 0.0,
                    histogram: 0.0,
                }
            };
            IndicatorPoint {
                date: bar.date,
                valid,
                value,
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

pub fn calculate_macd_default(bars: &[OhlcvBar]) -> IndicatorSeries {
    calculate_macd(bars, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn make_bars(prices: &[f64]) -> Vec<OhlcvBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                date: start + Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
            })
            .collect()
    }

    fn rising(count: usize) -> Vec<OhlcvBar> {
        let prices: Vec<f64> = (0..count).map(|i| 100.0 + i as f64).collect();
        make_bars(&prices)
    }

    #[test]
    fn macd_warmup_default() {
        let series = calculate_macd_default(&rising(40));

        let warmup = DEFAULT_SLOW - 1 + DEFAULT_SIGNAL - 1;
        for i in 0..warmup {
            assert!(!series.values[i].valid, "Index {} should not be valid", i);
        }
        assert!(series.values[warmup].valid);
    }

    #[test]
    fn macd_histogram_equals_line_minus_signal() {
        let lines = calculate_macd_default(&rising(40)).macd_values();
        for i in 0..40 {
            if !lines.histogram[i].is_nan() {
                assert!(
                    (lines.histogram[i] - (lines.line[i] - lines.signal[i])).abs() < f64::EPSILON
                );
            }
        }
    }

    #[test]
    fn macd_positive_on_rising_prices() {
        let lines = calculate_macd_default(&rising(60)).macd_values();
        assert!(lines.line[59] > 0.0);
    }

    #[test]
    fn macd_line_is_ema_fast_minus_ema_slow() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0]);
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let lines = calculate_macd(&bars, 3, 5, 2).macd_values();

        let ema_fast = ema_of(&closes, 3);
        let ema_slow = ema_of(&closes, 5);
        for i in 5..bars.len() {
            assert!((lines.line[i] - (ema_fast[i] - ema_slow[i])).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn macd_signal_seed_is_mean_of_first_lines() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0]);
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let lines = calculate_macd(&bars, 3, 5, 2).macd_values();

        let fast = ema_of(&closes, 3);
        let slow = ema_of(&closes, 5);
        let seed = ((fast[4] - slow[4]) + (fast[5] - slow[5])) / 2.0;
        assert!(lines.signal[4].is_nan());
        assert!((lines.signal[5] - seed).abs() < 1e-12);
    }

    #[test]
    fn macd_indicator_type() {
        let bars = make_bars(&[100.0, 101.0, 102.0]);
        let series = calculate_macd(&bars, 5, 10, 3);
        assert_eq!(
            series.indicator_type,
            IndicatorType::Macd {
                fast: 5,
                slow: 10,
                signal: 3
            }
        );
        assert_eq!(series.values.len(), 3);
    }

    #[test]
    fn macd_zero_period_is_all_invalid() {
        let bars = make_bars(&[100.0, 101.0, 102.0]);
        assert!(calculate_macd(&bars, 0, 26, 9).values.iter().all(|p| !p.valid));
        assert!(calculate_macd(&bars, 12, 0, 9).values.iter().all(|p| !p.valid));
        assert!(calculate_macd(&bars, 12, 26, 0).values.iter().all(|p| !p.valid));
    }

    #[test]
    fn macd_custom_parameters() {
        let series = calculate_macd(&rising(20), 5, 10, 3);

        let warmup = 10 - 1 + 3 - 1;
        assert!(!series.values[warmup - 1].valid);
        assert!(series.values[warmup].valid);
    }
}
