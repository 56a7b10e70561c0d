//! Resolved screening/backtest configuration.
//!
//! [`ScreenConfig::resolve`] reads every section through a [`ConfigPort`],
//! fills defaults for absent keys and rejects malformed or inconsistent
//! values before any instrument is evaluated.

use crate::domain::backtest::{BacktestConfig, StopFillPolicy};
use crate::domain::config_validation::validate_screen_config;
use crate::domain::error::TwscanError;
use crate::domain::execution::ExecutionConfig;
use crate::domain::frame::IndicatorParams;
use crate::domain::notification::NotifyFlags;
use crate::domain::signal::{EntryThresholds, ExitRules, Locale, ScoreWeights, SignalConfig};
use crate::domain::stops::StopParams;
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenConfig {
    pub indicators: IndicatorParams,
    pub signal: SignalConfig,
    pub inst_lookback: usize,
    pub stops: StopParams,
    pub backtest: BacktestConfig,
    pub notify: NotifyFlags,
    pub locale: Locale,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        ScreenConfig {
            indicators: IndicatorParams::default(),
            signal: SignalConfig::default(),
            inst_lookback: 20,
            stops: StopParams::default(),
            backtest: BacktestConfig::default(),
            notify: NotifyFlags::default(),
            locale: Locale::En,
        }
    }
}

impl ScreenConfig {
    pub fn resolve(config: &dyn ConfigPort) -> Result<Self, TwscanError> {
        let d = ScreenConfig::default();
        let r = Reader { config };

        let indicators = IndicatorParams {
            ema_period: r.count("indicators", "ema_period", d.indicators.ema_period)?,
            vol_fast: r.count("indicators", "vol_fast", d.indicators.vol_fast)?,
            vol_slow: r.count("indicators", "vol_slow", d.indicators.vol_slow)?,
            kd_n: r.count("indicators", "kd_n", d.indicators.kd_n)?,
            kd_smooth_k: r.count("indicators", "kd_k", d.indicators.kd_smooth_k)?,
            kd_smooth_d: r.count("indicators", "kd_d", d.indicators.kd_smooth_d)?,
            adx_period: r.count("indicators", "adx_period", d.indicators.adx_period)?,
            macd_fast: r.count("indicators", "macd_fast", d.indicators.macd_fast)?,
            macd_slow: r.count("indicators", "macd_slow", d.indicators.macd_slow)?,
            macd_signal: r.count("indicators", "macd_signal", d.indicators.macd_signal)?,
            atr_period: r.count("stop", "atr_period", d.indicators.atr_period)?,
            trail_ema_period: r.count("stop", "trail_ema_period", d.indicators.trail_ema_period)?,
        };

        let de = &d.signal.entry;
        let entry = EntryThresholds {
            kmin: r.float("entry", "kmin", de.kmin)?,
            kmax: r.float("entry", "kmax", de.kmax)?,
            dmin: r.float("entry", "dmin", de.dmin)?,
            dmax: r.float("entry", "dmax", de.dmax)?,
            adx_min: r.float("entry", "adx_min", de.adx_min)?,
            macd_require_positive: r.flag(
                "entry",
                "macd_require_positive",
                de.macd_require_positive,
            )?,
            macd_require_cross: r.flag("entry", "macd_require_cross", de.macd_require_cross)?,
        };

        let dx = &d.signal.exit;
        let exit = ExitRules {
            trend_break_ema: r.flag("exit", "trend_break_ema", dx.trend_break_ema)?,
            ema_break_bars: r.count("exit", "ema_break_bars", dx.ema_break_bars)?,
            volume_fade: r.flag("exit", "volume_fade", dx.volume_fade)?,
            macd_flip: r.flag("exit", "macd_flip", dx.macd_flip)?,
            adx_below: r.flag("exit", "adx_below_threshold", dx.adx_below)?,
            adx_weak_threshold: r.float("exit", "adx_weak_threshold", dx.adx_weak_threshold)?,
            adx_weakening: r.flag("exit", "adx_weakening", dx.adx_weakening)?,
            adx_weak_bars: r.count("exit", "adx_weak_bars", dx.adx_weak_bars)?,
            kd_death_high: r.flag("exit", "kd_death_high", dx.kd_death_high)?,
            kd_high_level: r.float("exit", "kd_high_level", dx.kd_high_level)?,
        };

        let ds = &d.signal.score;
        let score = ScoreWeights {
            trend: r.float("score", "w_trend", ds.trend)?,
            volume: r.float("score", "w_vol", ds.volume)?,
            adx: r.float("score", "w_adx", ds.adx)?,
            macd: r.float("score", "w_macd", ds.macd)?,
            inst: r.float("score", "w_inst", ds.inst)?,
            inst_norm: r.float("inst", "norm", ds.inst_norm)?,
        };

        let stops = StopParams {
            atr_mult: r.float("stop", "atr_mult", d.stops.atr_mult)?,
            trail_use_ema: r.flag("stop", "trail_use_ema", d.stops.trail_use_ema)?,
        };

        let db = &d.backtest;
        let backtest = BacktestConfig {
            initial_capital: r.float("backtest", "initial_capital", db.initial_capital)?,
            risk_per_trade: r.float("backtest", "risk_per_trade", db.risk_per_trade)?,
            execution: ExecutionConfig {
                commission_pct: r.float(
                    "backtest",
                    "commission_pct",
                    db.execution.commission_pct,
                )?,
                slippage_pct: r.float("backtest", "slippage_pct", db.execution.slippage_pct)?,
            },
            stop_fill: r.stop_fill()?,
            min_holding_bars: r.count("backtest", "min_holding_bars", db.min_holding_bars)?,
        };

        let resolved = ScreenConfig {
            indicators,
            signal: SignalConfig { entry, exit, score },
            inst_lookback: r.count("inst", "lookback", d.inst_lookback)?,
            stops,
            backtest,
            notify: NotifyFlags {
                on_entry: r.flag("notify", "on_entry", d.notify.on_entry)?,
                on_exit: r.flag("notify", "on_exit", d.notify.on_exit)?,
            },
            locale: r.locale()?,
        };
        validate_screen_config(&resolved)?;
        Ok(resolved)
    }
}

struct Reader<'a> {
    config: &'a dyn ConfigPort,
}

impl Reader<'_> {
    fn raw(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get_string(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn count(&self, section: &str, key: &str, default: usize) -> Result<usize, TwscanError> {
        if let Some(raw) = self.raw(section, key) {
            if raw.parse::<i64>().is_err() {
                return Err(TwscanError::invalid(section, key, "expected an integer"));
            }
        }
        let value = self.config.get_int(section, key, default as i64);
        usize::try_from(value)
            .map_err(|_| TwscanError::invalid(section, key, format!("{key} must not be negative")))
    }

    fn float(&self, section: &str, key: &str, default: f64) -> Result<f64, TwscanError> {
        if let Some(raw) = self.raw(section, key) {
            match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => {}
                _ => return Err(TwscanError::invalid(section, key, "expected a number")),
            }
        }
        Ok(self.config.get_double(section, key, default))
    }

    fn flag(&self, section: &str, key: &str, default: bool) -> Result<bool, TwscanError> {
        if let Some(raw) = self.raw(section, key) {
            if !matches!(
                raw.to_lowercase().as_str(),
                "true" | "yes" | "1" | "false" | "no" | "0"
            ) {
                return Err(TwscanError::invalid(section, key, "expected a boolean"));
            }
        }
        Ok(self.config.get_bool(section, key, default))
    }

    fn stop_fill(&self) -> Result<StopFillPolicy, TwscanError> {
        match self.raw("backtest", "stop_fill").as_deref() {
            None | Some("next_open") => Ok(StopFillPolicy::NextOpen),
            Some("stop_price") => Ok(StopFillPolicy::StopPrice),
            Some(_) => Err(TwscanError::invalid(
                "backtest",
                "stop_fill",
                "expected next_open or stop_price",
            )),
        }
    }

    fn locale(&self) -> Result<Locale, TwscanError> {
        match self.raw("notify", "locale").map(|v| v.to_lowercase()).as_deref() {
            None | Some("en") => Ok(Locale::En),
            Some("zh-tw") | Some("zh_tw") => Ok(Locale::ZhTw),
            Some(_) => Err(TwscanError::invalid("notify", "locale", "expected en or zh-tw")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn resolve(ini: &str) -> Result<ScreenConfig, TwscanError> {
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        ScreenConfig::resolve(&adapter)
    }

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = resolve("").unwrap();
        assert_eq!(cfg, ScreenConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = resolve(
            "[indicators]\nema_period = 60\n[entry]\nadx_min = 25\nmacd_require_cross = false\n\
             [backtest]\nstop_fill = stop_price\nmin_holding_bars = 3\n[notify]\nlocale = zh-TW\n",
        )
        .unwrap();
        assert_eq!(cfg.indicators.ema_period, 60);
        assert_eq!(cfg.signal.entry.adx_min, 25.0);
        assert!(!cfg.signal.entry.macd_require_cross);
        assert_eq!(cfg.backtest.stop_fill, StopFillPolicy::StopPrice);
        assert_eq!(cfg.backtest.min_holding_bars, 3);
        assert_eq!(cfg.locale, Locale::ZhTw);
    }

    #[test]
    fn non_numeric_value_is_rejected() {
        let err = resolve("[indicators]\nema_period = abc\n").unwrap_err();
        assert!(matches!(
            err,
            TwscanError::ConfigInvalid { ref key, .. } if key == "ema_period"
        ));
    }

    #[test]
    fn negative_period_is_rejected() {
        let err = resolve("[exit]\nema_break_bars = -1\n").unwrap_err();
        assert!(matches!(err, TwscanError::ConfigInvalid { .. }));
    }

    #[test]
    fn bad_boolean_is_rejected() {
        assert!(resolve("[exit]\nvolume_fade = maybe\n").is_err());
    }

    #[test]
    fn unknown_stop_fill_is_rejected() {
        assert!(resolve("[backtest]\nstop_fill = close\n").is_err());
    }

    #[test]
    fn inconsistent_kd_bounds_fail_validation() {
        let err = resolve("[entry]\nkmin = 90\nkmax = 80\n").unwrap_err();
        assert!(matches!(
            err,
            TwscanError::ConfigInvalid { ref section, ref key, .. }
                if section == "entry" && key == "kmin"
        ));
    }
}
