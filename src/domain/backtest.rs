//! Single-instrument backtest simulator.
//!
//! Decisions are taken on bar t's close and filled at bar t+1's open.
//! States: Flat → PendingEntry → Long → PendingExit → Flat. A stop breach on
//! the close takes priority over exit signals on the same bar. A position
//! still open after the last bar is closed at the final close, keeping the
//! stop or signal trigger when one fired on that bar.

use chrono::NaiveDate;
use tracing::debug;

use super::config::ScreenConfig;
use super::error::TwscanError;
use super::execution::{enter_long, exit_long, EntryResult, ExecutionConfig};
use super::frame::{compute_frame, IndicatorFrame};
use super::inst_flow::InstFlow;
use super::metrics::{BacktestSummary, EquityPoint};
use super::ohlcv::{validate_series, OhlcvBar};
use super::position::{ExitTrigger, Position, Trade};
use super::signal::{evaluate, exit_reasons};
use super::stops::{initial_stop, StopState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopFillPolicy {
    /// Fill at the next bar's open, like a signal exit.
    #[default]
    NextOpen,
    /// Fill on the breach bar at min(stop, open).
    StopPrice,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub risk_per_trade: f64,
    pub execution: ExecutionConfig,
    pub stop_fill: StopFillPolicy,
    /// Bars a position must be held before signal exits count; stops ignore it.
    pub min_holding_bars: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: 1_000_000.0,
            risk_per_trade: 0.1,
            execution: ExecutionConfig::default(),
            stop_fill: StopFillPolicy::NextOpen,
            min_holding_bars: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimState {
    Flat,
    PendingEntry { decided: usize },
    Long(Position),
    PendingExit(Position, ExitTrigger),
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub summary: BacktestSummary,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

/// Fewest bars that allow one fully-defined decision and a next-bar fill.
pub fn minimum_bars(config: &ScreenConfig) -> usize {
    config.indicators.warmup_bars() + 1
}

/// Validates `bars`, builds the frame and runs [`simulate`].
///
/// Too few bars yield a `Skipped` summary rather than an error.
pub fn run_backtest(
    code: &str,
    bars: &[OhlcvBar],
    inst: Option<&InstFlow>,
    config: &ScreenConfig,
) -> Result<BacktestResult, TwscanError> {
    if bars.is_empty() {
        return Err(TwscanError::NoData {
            code: code.to_string(),
        });
    }
    validate_series(bars).map_err(|source| TwscanError::InvalidSeries {
        code: code.to_string(),
        source,
    })?;

    let minimum = minimum_bars(config);
    if bars.len() < minimum {
        let err = TwscanError::InsufficientData {
            code: code.to_string(),
            bars: bars.len(),
            minimum,
        };
        debug!(code, bars = bars.len(), minimum, "skipping backtest");
        return Ok(BacktestResult {
            summary: BacktestSummary::skipped(
                code,
                config.backtest.initial_capital,
                err.to_string(),
            ),
            trades: Vec::new(),
            equity_curve: Vec::new(),
        });
    }

    let frame = compute_frame(bars, &config.indicators);
    let dates: Vec<NaiveDate> = bars.iter().map(|b| b.date).collect();
    let inst_sums = match inst {
        Some(flow) => flow.rolling_sums(&dates, config.inst_lookback),
        None => vec![None; bars.len()],
    };
    Ok(simulate(code, &frame, &inst_sums, config))
}

/// Runs the state machine over a precomputed frame.
///
/// `inst_sums` must be aligned with the frame rows.
pub fn simulate(
    code: &str,
    frame: &IndicatorFrame,
    inst_sums: &[Option<f64>],
    config: &ScreenConfig,
) -> BacktestResult {
    let bt = &config.backtest;
    let rows = &frame.rows;
    let n = rows.len();

    let mut cash = bt.initial_capital;
    let mut state = SimState::Flat;
    let mut trades: Vec<Trade> = Vec::new();
    let mut equity_curve: Vec<EquityPoint> = Vec::with_capacity(n);

    for i in 0..n {
        let row = &rows[i];
        let has_next = i + 1 < n;
        let inst_sum = inst_sums.get(i).copied().flatten();

        // Fills at this bar's open.
        state = match state {
            SimState::PendingEntry { decided } => {
                match enter_long(cash, cash, bt.risk_per_trade, row.open, &bt.execution) {
                    EntryResult::Entered {
                        quantity,
                        execution_price,
                        cost,
                        commission,
                    } => {
                        let signal_row = &rows[decided];
                        let stop = initial_stop(
                            signal_row.close,
                            signal_row.atr,
                            config.stops.atr_mult,
                        );
                        let position = Position {
                            code: code.to_string(),
                            entry_date: row.date,
                            entry_index: i,
                            entry_price: execution_price,
                            entry_market_price: row.open,
                            shares: quantity,
                            entry_commission: commission,
                            cash_at_entry: cash,
                            stops: StopState::new(stop),
                        };
                        cash -= cost + commission;
                        debug!(code, date = %row.date, quantity, price = execution_price, "entry filled");
                        SimState::Long(position)
                    }
                    EntryResult::InsufficientCapital => {
                        debug!(code, date = %row.date, "entry skipped: zero shares");
                        SimState::Flat
                    }
                }
            }
            SimState::PendingExit(position, trigger) => {
                cash += close_position(
                    &position,
                    row.open,
                    row.date,
                    i,
                    trigger,
                    &bt.execution,
                    &mut trades,
                );
                SimState::Flat
            }
            other => other,
        };

        // Decisions on this bar's close.
        state = match state {
            SimState::Long(mut position) => {
                if config.stops.trail_use_ema {
                    position.stops.ratchet(row.trail_ema);
                }
                let signals = exit_reasons(frame, i, &config.signal.exit);
                let breached = position
                    .stops
                    .effective()
                    .filter(|_| position.stops.is_breached(row.close));

                if let Some(level) = breached {
                    let trigger = ExitTrigger::Stop {
                        trailing: position.stops.trailing_binds(),
                        level,
                        also: signals,
                    };
                    if bt.stop_fill == StopFillPolicy::StopPrice {
                        let price = level.min(row.open);
                        cash += close_position(
                            &position,
                            price,
                            row.date,
                            i,
                            trigger,
                            &bt.execution,
                            &mut trades,
                        );
                        SimState::Flat
                    } else {
                        SimState::PendingExit(position, trigger)
                    }
                } else if !signals.is_empty() && position.bars_held(i) >= bt.min_holding_bars {
                    SimState::PendingExit(position, ExitTrigger::Signal(signals))
                } else {
                    SimState::Long(position)
                }
            }
            SimState::Flat => {
                let entry = evaluate(frame, i, false, inst_sum, &config.signal)
                    .is_some_and(|e| e.entry);
                if entry && has_next {
                    SimState::PendingEntry { decided: i }
                } else {
                    SimState::Flat
                }
            }
            other => other,
        };

        let held_value = match &state {
            SimState::Long(p) | SimState::PendingExit(p, _) => p.market_value(row.close),
            _ => 0.0,
        };
        equity_curve.push(EquityPoint {
            date: row.date,
            equity: cash + held_value,
        });
    }

    let open_at_end = match state {
        SimState::Long(position) => Some((position, ExitTrigger::EndOfData)),
        // Decided on the final bar; there is no next open to fill at.
        SimState::PendingExit(position, trigger) => Some((position, trigger)),
        _ => None,
    };
    if let (Some((position, trigger)), Some(last)) = (open_at_end, rows.last()) {
        cash += close_position(
            &position,
            last.close,
            last.date,
            n - 1,
            trigger,
            &bt.execution,
            &mut trades,
        );
        if let Some(point) = equity_curve.last_mut() {
            point.equity = cash;
        }
    }

    let summary = BacktestSummary::compute(code, bt.initial_capital, &trades, &equity_curve);
    BacktestResult {
        summary,
        trades,
        equity_curve,
    }
}

/// Sells the whole position at `market_price` and returns the cash credited.
fn close_position(
    position: &Position,
    market_price: f64,
    date: NaiveDate,
    index: usize,
    trigger: ExitTrigger,
    execution: &ExecutionConfig,
    trades: &mut Vec<Trade>,
) -> f64 {
    let fill = exit_long(position.shares, market_price, execution);
    let trade = Trade::close(position, &fill, market_price, date, index, trigger);
    debug!(
        code = %trade.code,
        date = %date,
        price = fill.exit_price,
        reason = %trade.exit,
        "exit filled"
    );
    trades.push(trade);
    fill.proceeds()
}

/// Runs one instrument, turning any failure into a `Skipped` summary.
pub fn run_or_skip(
    code: &str,
    bars: Result<Vec<OhlcvBar>, TwscanError>,
    inst: Option<&InstFlow>,
    config: &ScreenConfig,
) -> BacktestResult {
    bars.and_then(|bars| run_backtest(code, &bars, inst, config))
        .unwrap_or_else(|err| {
            debug!(code, error = %err, "backtest skipped");
            BacktestResult {
                summary: BacktestSummary::skipped(
                    code,
                    config.backtest.initial_capital,
                    err.to_string(),
                ),
                trades: Vec::new(),
                equity_curve: Vec::new(),
            }
        })
}
