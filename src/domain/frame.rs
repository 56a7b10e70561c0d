//! Per-bar aligned indicator frame.
//!
//! One [`FrameRow`] per input bar. Values inside an indicator's warmup window
//! are NaN; every comparison made against a frame must treat NaN as false.

use chrono::NaiveDate;

use crate::domain::indicator::{
    calculate_adx, calculate_atr, calculate_ema, calculate_macd, calculate_sma,
    calculate_stochastic, calculate_volume_sma,
};
use crate::domain::ohlcv::OhlcvBar;

/// Close-price SMA length used by the volume-fade exit.
pub const CLOSE_MA_PERIOD: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorParams {
    pub ema_period: usize,
    pub vol_fast: usize,
    pub vol_slow: usize,
    pub kd_n: usize,
    pub kd_smooth_k: usize,
    pub kd_smooth_d: usize,
    pub adx_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub atr_period: usize,
    pub trail_ema_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        IndicatorParams {
            ema_period: 117,
            vol_fast: 5,
            vol_slow: 10,
            kd_n: 9,
            kd_smooth_k: 3,
            kd_smooth_d: 3,
            adx_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            atr_period: 14,
            trail_ema_period: 50,
        }
    }
}

impl IndicatorParams {
    /// Bars needed before every frame column is defined.
    pub fn warmup_bars(&self) -> usize {
        [
            self.ema_period,
            self.vol_fast,
            self.vol_slow,
            (self.kd_n + self.kd_smooth_k + self.kd_smooth_d).saturating_sub(2),
            2 * self.adx_period,
            (self.macd_fast.max(self.macd_slow) + self.macd_signal).saturating_sub(1),
            self.atr_period,
            self.trail_ema_period,
            CLOSE_MA_PERIOD,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameRow {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub ema: f64,
    pub vol_ma_fast: f64,
    pub vol_ma_slow: f64,
    pub k: f64,
    pub d: f64,
    pub adx: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_hist: f64,
    pub atr: f64,
    pub trail_ema: f64,
    pub close_ma5: f64,
}

impl FrameRow {
    /// A row with prices from `bar` and every indicator undefined.
    pub fn undefined(bar: &OhlcvBar) -> Self {
        FrameRow {
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume as f64,
            ema: f64::NAN,
            vol_ma_fast: f64::NAN,
            vol_ma_slow: f64::NAN,
            k: f64::NAN,
            d: f64::NAN,
            adx: f64::NAN,
            macd: f64::NAN,
            macd_signal: f64::NAN,
            macd_hist: f64::NAN,
            atr: f64::NAN,
            trail_ema: f64::NAN,
            close_ma5: f64::NAN,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IndicatorFrame {
    pub rows: Vec<FrameRow>,
}

impl IndicatorFrame {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&FrameRow> {
        self.rows.last()
    }
}

pub fn compute_frame(bars: &[OhlcvBar], params: &IndicatorParams) -> IndicatorFrame {
    let ema = calculate_ema(bars, params.ema_period).simple_values();
    let vol_fast = calculate_volume_sma(bars, params.vol_fast).simple_values();
    let vol_slow = calculate_volume_sma(bars, params.vol_slow).simple_values();
    let (k, d) = calculate_stochastic(
        bars,
        params.kd_n,
        params.kd_smooth_k,
        params.kd_smooth_d,
    )
    .stochastic_values();
    let adx = calculate_adx(bars, params.adx_period).simple_values();
    let macd = calculate_macd(
        bars,
        params.macd_fast,
        params.macd_slow,
        params.macd_signal,
    )
    .macd_values();
    let atr = calculate_atr(bars, params.atr_period).simple_values();
    let trail = calculate_ema(bars, params.trail_ema_period).simple_values();
    let close_ma5 = calculate_sma(bars, CLOSE_MA_PERIOD).simple_values();

    let rows = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| FrameRow {
            ema: ema[i],
            vol_ma_fast: vol_fast[i],
            vol_ma_slow: vol_slow[i],
            k: k[i],
            d: d[i],
            adx: adx[i],
            macd: macd.line[i],
            macd_signal: macd.signal[i],
            macd_hist: macd.histogram[i],
            atr: atr[i],
            trail_ema: trail[i],
            close_ma5: close_ma5[i],
            ..FrameRow::undefined(bar)
        })
        .collect();

    IndicatorFrame { rows }
}
