//! Backtest summary statistics.

use chrono::NaiveDate;

use super::position::Trade;

const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    Completed,
    Skipped { reason: String },
}

impl RunStatus {
    pub fn label(&self) -> &str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::Skipped { .. } => "skipped",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSummary {
    pub code: String,
    pub status: RunStatus,
    pub initial_equity: f64,
    pub final_equity: f64,
    pub total_return: f64,
    pub cagr: f64,
    /// `None` when no trades closed.
    pub win_rate: Option<f64>,
    pub trade_count: usize,
    pub avg_win: Option<f64>,
    pub avg_loss: Option<f64>,
    pub max_drawdown: f64,
}

impl BacktestSummary {
    /// Zero-trade summary for an instrument that was not simulated.
    pub fn skipped(code: &str, initial_equity: f64, reason: impl Into<String>) -> Self {
        BacktestSummary {
            code: code.to_string(),
            status: RunStatus::Skipped {
                reason: reason.into(),
            },
            initial_equity,
            final_equity: initial_equity,
            total_return: 0.0,
            cagr: 0.0,
            win_rate: None,
            trade_count: 0,
            avg_win: None,
            avg_loss: None,
            max_drawdown: 0.0,
        }
    }

    pub fn compute(
        code: &str,
        initial_equity: f64,
        trades: &[Trade],
        equity_curve: &[EquityPoint],
    ) -> Self {
        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_equity);

        let total_return = if initial_equity > 0.0 {
            final_equity / initial_equity - 1.0
        } else {
            0.0
        };

        let calendar_days = match (equity_curve.first(), equity_curve.last()) {
            (Some(first), Some(last)) => (last.date - first.date).num_days(),
            _ => 0,
        };

        let wins: Vec<f64> = trades
            .iter()
            .filter(|t| t.is_win())
            .map(|t| t.net_pnl)
            .collect();
        let losses: Vec<f64> = trades
            .iter()
            .filter(|t| !t.is_win())
            .map(|t| t.net_pnl)
            .collect();

        BacktestSummary {
            code: code.to_string(),
            status: RunStatus::Completed,
            initial_equity,
            final_equity,
            total_return,
            cagr: cagr(initial_equity, final_equity, calendar_days),
            win_rate: (!trades.is_empty()).then(|| wins.len() as f64 / trades.len() as f64),
            trade_count: trades.len(),
            avg_win: mean(&wins),
            avg_loss: mean(&losses),
            max_drawdown: compute_drawdown(equity_curve),
        }
    }
}

/// (final / initial)^(365.25 / days) - 1, 0 for a non-positive span or equity.
pub fn cagr(initial: f64, final_equity: f64, calendar_days: i64) -> f64 {
    if calendar_days <= 0 || initial <= 0.0 || final_equity <= 0.0 {
        return 0.0;
    }
    (final_equity / initial).powf(DAYS_PER_YEAR / calendar_days as f64) - 1.0
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

/// Largest peak-to-trough fall as a fraction of the peak.
pub fn compute_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let Some(first) = equity_curve.first() else {
        return 0.0;
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
        }
    }
    max_dd
}
