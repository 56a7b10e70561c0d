//! Simple moving averages of close and volume.

use crate::domain::indicator::{
    rolling_mean, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    to_series(IndicatorType::Sma(period), bars, rolling_mean(&closes, period))
}

pub fn calculate_volume_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume as f64).collect();
    to_series(
        IndicatorType::VolumeSma(period),
        bars,
        rolling_mean(&volumes, period),
    )
}

fn to_series(indicator_type: IndicatorType, bars: &[OhlcvBar], raw: Vec<f64>) -> IndicatorSeries {
    IndicatorSeries {
        indicator_type,
        values: bars
            .iter()
            .zip(raw)
            .map(|(bar, v)| IndicatorPoint {
                date: bar.date,
                valid: !v.is_nan(),
                value: IndicatorValue::Simple(if v.is_nan() { 0.0 } else { v }),
            })
            .collect(),
    }
}
