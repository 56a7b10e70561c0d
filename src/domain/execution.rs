//! Fill simulation: slippage, commission and position sizing.
//!
//! Cost rates are fractions of notional (0.001 = 0.1%).

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    pub commission_pct: f64,
    pub slippage_pct: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            commission_pct: 0.001,
            slippage_pct: 0.001,
        }
    }
}

pub fn calculate_commission(trade_value: f64, config: &ExecutionConfig) -> f64 {
    trade_value * config.commission_pct
}

/// Buy fill: market_price * (1 + slippage)
pub fn apply_slippage_long_entry(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 + slippage_pct)
}

/// Sell fill: market_price * (1 - slippage)
pub fn apply_slippage_long_exit(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 - slippage_pct)
}

/// Whole shares for a long entry.
///
/// Starts from floor(equity * risk / price) and steps down until
/// notional + commission fits in `cash`.
pub fn position_size(
    equity: f64,
    cash: f64,
    risk_per_trade: f64,
    execution_price: f64,
    config: &ExecutionConfig,
) -> i64 {
    if execution_price <= 0.0 || !execution_price.is_finite() || equity <= 0.0 || cash <= 0.0 {
        return 0;
    }
    let by_risk = (equity * risk_per_trade / execution_price).floor();
    let by_cash = (cash / (execution_price * (1.0 + config.commission_pct))).floor();
    let mut quantity = by_risk.min(by_cash).max(0.0) as i64;

    while quantity > 0 {
        let cost = quantity as f64 * execution_price;
        if cost + calculate_commission(cost, config) <= cash {
            break;
        }
        quantity -= 1;
    }
    quantity
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    Entered {
        quantity: i64,
        execution_price: f64,
        cost: f64,
        commission: f64,
    },
    InsufficientCapital,
}

/// Prices a long entry at `market_price`; does not touch any account.
pub fn enter_long(
    equity: f64,
    cash: f64,
    risk_per_trade: f64,
    market_price: f64,
    config: &ExecutionConfig,
) -> EntryResult {
    let execution_price = apply_slippage_long_entry(market_price, config.slippage_pct);
    let quantity = position_size(equity, cash, risk_per_trade, execution_price, config);
    if quantity == 0 {
        return EntryResult::InsufficientCapital;
    }

    let cost = quantity as f64 * execution_price;
    EntryResult::Entered {
        quantity,
        execution_price,
        cost,
        commission: calculate_commission(cost, config),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitResult {
    pub quantity: i64,
    pub exit_price: f64,
    pub exit_value: f64,
    pub exit_commission: f64,
}

impl ExitResult {
    /// Cash credited to the account.
    pub fn proceeds(&self) -> f64 {
        self.exit_value - self.exit_commission
    }
}

pub fn exit_long(quantity: i64, market_price: f64, config: &ExecutionConfig) -> ExitResult {
    let exit_price = apply_slippage_long_exit(market_price, config.slippage_pct);
    let exit_value = quantity as f64 * exit_price;
    ExitResult {
        quantity,
        exit_price,
        exit_value,
        exit_commission: calculate_commission(exit_value, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn costs(commission_pct: f64, slippage_pct: f64) -> ExecutionConfig {
        ExecutionConfig {
            commission_pct,
            slippage_pct,
        }
    }

    #[test]
    fn commission_is_fraction_of_value() {
        assert!((calculate_commission(10_000.0, &costs(0.001, 0.0)) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn slippage_entry_and_exit() {
        assert!((apply_slippage_long_entry(100.0, 0.001) - 100.1).abs() < 1e-9);
        assert!((apply_slippage_long_exit(100.0, 0.001) - 99.9).abs() < 1e-9);
    }

    #[test]
    fn size_by_risk_fraction() {
        // 1,000,000 * 0.1 / 100 = 1000 shares
        let qty = position_size(1_000_000.0, 1_000_000.0, 0.1, 100.0, &costs(0.001, 0.0));
        assert_eq!(qty, 1000);
    }

    #[test]
    fn size_capped_by_cash_with_commission() {
        // Full-equity sizing would need 100 * 100 * 1.01 = 10,100 > 10,000.
        let qty = position_size(10_000.0, 10_000.0, 1.0, 100.0, &costs(0.01, 0.0));
        assert_eq!(qty, 99);
    }

    #[test]
    fn size_zero_when_price_exceeds_budget() {
        let qty = position_size(1_000.0, 1_000.0, 0.1, 500.0, &costs(0.0, 0.0));
        assert_eq!(qty, 0);
    }

    #[test]
    fn enter_long_insufficient_capital() {
        let result = enter_long(100.0, 100.0, 0.1, 50.0, &costs(0.0, 0.0));
        assert_eq!(result, EntryResult::InsufficientCapital);
    }

    #[test]
    fn enter_long_applies_slippage() {
        match enter_long(100_000.0, 100_000.0, 0.1, 100.0, &costs(0.001, 0.001)) {
            EntryResult::Entered {
                quantity,
                execution_price,
                cost,
                commission,
            } => {
                assert!((execution_price - 100.1).abs() < 1e-9);
                assert_eq!(quantity, 99);
                assert!((cost - 99.0 * 100.1).abs() < 1e-6);
                assert!((commission - cost * 0.001).abs() < 1e-9);
            }
            EntryResult::InsufficientCapital => panic!("expected entry"),
        }
    }

    #[test]
    fn exit_long_proceeds() {
        let exit = exit_long(100, 110.0, &costs(0.001, 0.001));
        assert!((exit.exit_price - 109.89).abs() < 1e-9);
        assert!((exit.proceeds() - 10_989.0 * 0.999).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn sizing_never_exceeds_risk_or_cash(
            equity in 1_000.0f64..10_000_000.0,
            risk in 0.01f64..1.0,
            price in 1.0f64..2_000.0,
            commission in 0.0f64..0.01,
        ) {
            let config = costs(commission, 0.0);
            let qty = position_size(equity, equity, risk, price, &config);
            let cost = qty as f64 * price;
            prop_assert!(cost <= equity * risk + 1e-6);
            prop_assert!(cost + calculate_commission(cost, &config) <= equity + 1e-6);
        }
    }
}
