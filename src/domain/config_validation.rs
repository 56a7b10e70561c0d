//! Configuration validation.
//!
//! Runs after defaults are filled so every rule sees a concrete value.

use crate::domain::config::ScreenConfig;
use crate::domain::error::TwscanError;
use chrono::NaiveDate;

pub fn validate_screen_config(config: &ScreenConfig) -> Result<(), TwscanError> {
    validate_periods(config)?;
    validate_entry_thresholds(config)?;
    validate_exit_rules(config)?;
    validate_score(config)?;
    validate_stops(config)?;
    validate_backtest(config)?;
    Ok(())
}

fn validate_periods(config: &ScreenConfig) -> Result<(), TwscanError> {
    let p = &config.indicators;
    let periods = [
        ("indicators", "ema_period", p.ema_period),
        ("indicators", "vol_fast", p.vol_fast),
        ("indicators", "vol_slow", p.vol_slow),
        ("indicators", "kd_n", p.kd_n),
        ("indicators", "kd_k", p.kd_smooth_k),
        ("indicators", "kd_d", p.kd_smooth_d),
        ("indicators", "adx_period", p.adx_period),
        ("indicators", "macd_fast", p.macd_fast),
        ("indicators", "macd_slow", p.macd_slow),
        ("indicators", "macd_signal", p.macd_signal),
        ("stop", "atr_period", p.atr_period),
        ("stop", "trail_ema_period", p.trail_ema_period),
        ("inst", "lookback", config.inst_lookback),
    ];
    for (section, key, value) in periods {
        if value == 0 {
            return Err(TwscanError::invalid(
                section,
                key,
                format!("{key} must be at least 1"),
            ));
        }
    }
    if p.macd_fast >= p.macd_slow {
        return Err(TwscanError::invalid(
            "indicators",
            "macd_fast",
            "macd_fast must be shorter than macd_slow",
        ));
    }
    if p.vol_fast >= p.vol_slow {
        return Err(TwscanError::invalid(
            "indicators",
            "vol_fast",
            "vol_fast must be shorter than vol_slow",
        ));
    }
    Ok(())
}

fn validate_entry_thresholds(config: &ScreenConfig) -> Result<(), TwscanError> {
    let e = &config.signal.entry;
    for (key, value) in [("kmin", e.kmin), ("kmax", e.kmax), ("dmin", e.dmin), ("dmax", e.dmax)] {
        if !(0.0..=100.0).contains(&value) {
            return Err(TwscanError::invalid(
                "entry",
                key,
                format!("{key} must be between 0 and 100"),
            ));
        }
    }
    if e.kmin > e.kmax {
        return Err(TwscanError::invalid("entry", "kmin", "kmin must not exceed kmax"));
    }
    if e.dmin > e.dmax {
        return Err(TwscanError::invalid("entry", "dmin", "dmin must not exceed dmax"));
    }
    if e.adx_min < 0.0 {
        return Err(TwscanError::invalid(
            "entry",
            "adx_min",
            "adx_min must be non-negative",
        ));
    }
    Ok(())
}

fn validate_exit_rules(config: &ScreenConfig) -> Result<(), TwscanError> {
    let x = &config.signal.exit;
    if x.adx_weak_threshold < 0.0 {
        return Err(TwscanError::invalid(
            "exit",
            "adx_weak_threshold",
            "adx_weak_threshold must be non-negative",
        ));
    }
    if !(0.0..=100.0).contains(&x.kd_high_level) {
        return Err(TwscanError::invalid(
            "exit",
            "kd_high_level",
            "kd_high_level must be between 0 and 100",
        ));
    }
    Ok(())
}

fn validate_score(config: &ScreenConfig) -> Result<(), TwscanError> {
    let w = &config.signal.score;
    for (key, value) in [
        ("w_trend", w.trend),
        ("w_vol", w.volume),
        ("w_adx", w.adx),
        ("w_macd", w.macd),
        ("w_inst", w.inst),
    ] {
        if value < 0.0 {
            return Err(TwscanError::invalid(
                "score",
                key,
                format!("{key} must be non-negative"),
            ));
        }
    }
    if w.inst_norm <= 0.0 {
        return Err(TwscanError::invalid("inst", "norm", "norm must be positive"));
    }
    Ok(())
}

fn validate_stops(config: &ScreenConfig) -> Result<(), TwscanError> {
    if config.stops.atr_mult <= 0.0 {
        return Err(TwscanError::invalid(
            "stop",
            "atr_mult",
            "atr_mult must be positive",
        ));
    }
    Ok(())
}

fn validate_backtest(config: &ScreenConfig) -> Result<(), TwscanError> {
    let b = &config.backtest;
    if b.initial_capital <= 0.0 {
        return Err(TwscanError::invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    if b.risk_per_trade <= 0.0 || b.risk_per_trade > 1.0 {
        return Err(TwscanError::invalid(
            "backtest",
            "risk_per_trade",
            "risk_per_trade must be in (0, 1]",
        ));
    }
    for (key, value) in [
        ("commission_pct", b.execution.commission_pct),
        ("slippage_pct", b.execution.slippage_pct),
    ] {
        if !(0.0..1.0).contains(&value) {
            return Err(TwscanError::invalid(
                "backtest",
                key,
                format!("{key} must be in [0, 1)"),
            ));
        }
    }
    Ok(())
}

/// Parses optional `[run]` start/end dates and checks their order.
pub fn validate_date_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>), TwscanError> {
    let start_date = start.map(|s| parse_date(s, "start_date")).transpose()?;
    let end_date = end.map(|s| parse_date(s, "end_date")).transpose()?;
    if let (Some(s), Some(e)) = (start_date, end_date) {
        if s > e {
            return Err(TwscanError::invalid(
                "run",
                "start_date",
                "start_date must not be after end_date",
            ));
        }
    }
    Ok((start_date, end_date))
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate, TwscanError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        TwscanError::invalid(
            "run",
            field,
            format!("invalid {field} format, expected YYYY-MM-DD"),
        )
    })
}
