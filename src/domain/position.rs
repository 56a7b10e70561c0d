//! Open positions, exit triggers and closed trades.

use chrono::NaiveDate;
use std::fmt;

use super::execution::ExitResult;
use super::signal::ExitReasonSet;
use super::stops::StopState;

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub code: String,
    pub entry_date: NaiveDate,
    pub entry_index: usize,
    /// Fill price including slippage.
    pub entry_price: f64,
    /// Open price of the fill bar before slippage.
    pub entry_market_price: f64,
    pub shares: i64,
    pub entry_commission: f64,
    pub cash_at_entry: f64,
    pub stops: StopState,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.shares as f64 * price
    }

    /// Notional plus entry commission.
    pub fn entry_outlay(&self) -> f64 {
        self.shares as f64 * self.entry_price + self.entry_commission
    }

    pub fn bars_held(&self, index: usize) -> usize {
        index.saturating_sub(self.entry_index)
    }
}

/// What closed a position.
#[derive(Debug, Clone, PartialEq)]
pub enum ExitTrigger {
    Signal(ExitReasonSet),
    /// Close at or below the effective stop. `also` holds any exit reasons
    /// that fired on the same bar.
    Stop {
        trailing: bool,
        level: f64,
        also: ExitReasonSet,
    },
    EndOfData,
}

impl ExitTrigger {
    pub fn label(&self) -> String {
        match self {
            ExitTrigger::Signal(reasons) => reasons.to_string(),
            ExitTrigger::Stop { trailing, also, .. } => {
                let kind = if *trailing { "trailing_stop" } else { "stop_loss" };
                if also.is_empty() {
                    kind.to_string()
                } else {
                    format!("{kind};{also}")
                }
            }
            ExitTrigger::EndOfData => "end_of_data".to_string(),
        }
    }
}

impl fmt::Display for ExitTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub code: String,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub shares: i64,
    pub exit: ExitTrigger,
    /// exit market price / entry market price - 1, before costs.
    pub gross_return: f64,
    /// Net P&L over total entry outlay.
    pub net_return: f64,
    pub net_pnl: f64,
    pub commission: f64,
    pub holding_days: i64,
    pub bars_held: usize,
}

impl Trade {
    pub fn close(
        position: &Position,
        fill: &ExitResult,
        exit_market_price: f64,
        exit_date: NaiveDate,
        exit_index: usize,
        exit: ExitTrigger,
    ) -> Self {
        let outlay = position.entry_outlay();
        let net_pnl = fill.proceeds() - outlay;
        let gross_return = if position.entry_market_price > 0.0 {
            exit_market_price / position.entry_market_price - 1.0
        } else {
            0.0
        };
        Trade {
            code: position.code.clone(),
            entry_date: position.entry_date,
            entry_price: position.entry_price,
            exit_date,
            exit_price: fill.exit_price,
            shares: position.shares,
            exit,
            gross_return,
            net_return: if outlay > 0.0 { net_pnl / outlay } else { 0.0 },
            net_pnl,
            commission: position.entry_commission + fill.exit_commission,
            holding_days: (exit_date - position.entry_date).num_days(),
            bars_held: position.bars_held(exit_index),
        }
    }

    pub fn is_win(&self) -> bool {
        self.net_return > 0.0
    }
}
