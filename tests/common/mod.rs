#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::HashMap;
use twscan::domain::backtest::{BacktestConfig, StopFillPolicy};
use twscan::domain::config::ScreenConfig;
use twscan::domain::error::TwscanError;
use twscan::domain::execution::ExecutionConfig;
use twscan::domain::frame::{FrameRow, IndicatorFrame, IndicatorParams};
pub use twscan::domain::ohlcv::OhlcvBar;
use twscan::domain::signal::{EntryThresholds, ExitRules};
use twscan::ports::data_port::DataPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, TwscanError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(TwscanError::Data {
                reason: reason.clone(),
            });
        }
        match self.data.get(code) {
            Some(bars) => Ok(bars
                .iter()
                .filter(|b| start_date.is_none_or(|s| b.date >= s))
                .filter(|b| end_date.is_none_or(|e| b.date <= e))
                .cloned()
                .collect()),
            None => Err(TwscanError::NoData {
                code: code.to_string(),
            }),
        }
    }

    fn list_symbols(&self) -> Result<Vec<String>, TwscanError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TwscanError> {
        match self.data.get(code) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(date: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close - 0.5,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000,
    }
}

/// Accelerating uptrend with steadily growing volume. With
/// [`fast_config`] every entry condition holds once indicators are defined.
pub fn generate_rising_bars(start_date: &str, count: usize) -> Vec<OhlcvBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    (0..count)
        .map(|i| {
            let x = i as f64;
            let close = 100.0 + 0.05 * x * x;
            OhlcvBar {
                date: start + chrono::Duration::days(i as i64),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000 + 100 * i as i64,
            }
        })
        .collect()
}

/// Short lookbacks, KD bounds wide open and the ADX-weakening and KD
/// death-cross exits disabled. Zero costs.
pub fn fast_config() -> ScreenConfig {
    ScreenConfig {
        indicators: IndicatorParams {
            ema_period: 5,
            vol_fast: 2,
            vol_slow: 4,
            kd_n: 3,
            kd_smooth_k: 2,
            kd_smooth_d: 2,
            adx_period: 3,
            macd_fast: 3,
            macd_slow: 6,
            macd_signal: 2,
            atr_period: 3,
            trail_ema_period: 5,
        },
        signal: twscan::domain::signal::SignalConfig {
            entry: EntryThresholds {
                kmin: 0.0,
                kmax: 100.0,
                dmin: 0.0,
                dmax: 100.0,
                adx_min: 10.0,
                ..EntryThresholds::default()
            },
            exit: ExitRules {
                adx_weakening: false,
                kd_death_high: false,
                ..ExitRules::default()
            },
            ..Default::default()
        },
        backtest: BacktestConfig {
            initial_capital: 100_000.0,
            risk_per_trade: 0.5,
            execution: ExecutionConfig {
                commission_pct: 0.0,
                slippage_pct: 0.0,
            },
            stop_fill: StopFillPolicy::NextOpen,
            min_holding_bars: 0,
        },
        ..ScreenConfig::default()
    }
}

/// A row where all five entry conditions hold and no exit reason fires.
pub fn bullish_row(day: u32, open: f64, close: f64) -> FrameRow {
    let bar = OhlcvBar {
        date: date(2024, 1, day),
        open,
        high: open.max(close) + 1.0,
        low: open.min(close) - 1.0,
        close,
        volume: 1000,
    };
    FrameRow {
        ema: close - 5.0,
        vol_ma_fast: 1200.0,
        vol_ma_slow: 1000.0,
        k: 50.0,
        d: 45.0,
        adx: 40.0,
        macd: 1.0,
        macd_signal: 0.5,
        macd_hist: 0.5,
        atr: 2.0,
        trail_ema: close - 4.0,
        close_ma5: close - 1.0,
        ..FrameRow::undefined(&bar)
    }
}

/// Same as [`bullish_row`] but with the MACD condition failing, so no entry.
pub fn neutral_row(day: u32, open: f64, close: f64) -> FrameRow {
    FrameRow {
        macd_signal: 2.0,
        ..bullish_row(day, open, close)
    }
}

pub fn frame(rows: Vec<FrameRow>) -> IndicatorFrame {
    IndicatorFrame { rows }
}
