use crate::error::BotError;
use crate::execution::quantizer::floor_to_step;
use crate::models::{Balances, OrderIntent, Signal, TradeSide, TradingLimits};
use crate::Result;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionAction {
    Execute(OrderIntent),
    Skip,
}

#[derive(Debug, Clone)]
pub struct ExecutionDecision {
    pub action: ExecutionAction,
    pub reason: String,
}

impl ExecutionDecision {
    fn skip(reason: impl Into<String>) -> Self {
        Self {
            action: ExecutionAction::Skip,
            reason: reason.into(),
        }
    }
}

/// Turns a signal into a sized order that respects the exchange limits
pub struct Executor {
    limits: TradingLimits,
}

impl Executor {
    pub fn new(limits: TradingLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &TradingLimits {
        &self.limits
    }

    /// Process a signal and decide what to do
    ///
    /// Buys spend the whole free quote balance, sells the whole free base
    /// balance, both raised to `min_qty`. An order whose notional after
    /// quantization falls below `min_notional` is skipped, not an error.
    pub fn process_signal(
        &self,
        signal: Signal,
        balances: &Balances,
        current_price: Decimal,
    ) -> Result<ExecutionDecision> {
        let side = match signal {
            Signal::Buy => TradeSide::Buy,
            Signal::Sell => TradeSide::Sell,
            Signal::Hold => return Ok(ExecutionDecision::skip("Hold signal")),
        };

        let intent = self.size_order(side, balances, current_price)?;

        if intent.notional < self.limits.min_notional {
            return Ok(ExecutionDecision::skip(format!(
                "Notional {} below minimum {}",
                intent.notional, self.limits.min_notional
            )));
        }

        Ok(ExecutionDecision {
            reason: format!("{} signal with notional {}", side, intent.notional),
            action: ExecutionAction::Execute(intent),
        })
    }

    /// Calculate order size from the free balance of the side being spent
    pub fn size_order(
        &self,
        side: TradeSide,
        balances: &Balances,
        current_price: Decimal,
    ) -> Result<OrderIntent> {
        if current_price <= Decimal::ZERO {
            return Err(BotError::Unclassified(format!(
                "Cannot size order at non-positive price {}",
                current_price
            )));
        }

        let available = match side {
            TradeSide::Buy => balances
                .quote
                .checked_div(current_price)
                .ok_or_else(|| BotError::Unclassified("Order size overflows".to_string()))?,
            TradeSide::Sell => balances.base,
        };
        let raw_quantity = available.max(self.limits.min_qty);

        let quantized = floor_to_step(raw_quantity, self.limits.step_size)?;
        let notional = quantized * current_price;

        Ok(OrderIntent {
            side,
            raw_quantity,
            quantity: quantized.to_string(),
            notional,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn btc_limits() -> TradingLimits {
        TradingLimits {
            min_qty: d("0.00001"),
            min_notional: d("10"),
            step_size: d("0.00001"),
        }
    }

    #[test]
    fn test_hold_signal_skips() {
        let executor = Executor::new(btc_limits());
        let balances = Balances {
            base: d("1"),
            quote: d("1000"),
        };

        let decision = executor
            .process_signal(Signal::Hold, &balances, d("50000"))
            .unwrap();

        assert!(matches!(decision.action, ExecutionAction::Skip));
        assert!(decision.reason.contains("Hold"));
    }

    #[test]
    fn test_buy_spends_quote_balance() {
        let executor = Executor::new(btc_limits());
        let balances = Balances {
            base: Decimal::ZERO,
            quote: d("1000"),
        };

        let decision = executor
            .process_signal(Signal::Buy, &balances, d("30000"))
            .unwrap();

        match decision.action {
            ExecutionAction::Execute(intent) => {
                assert_eq!(intent.side, TradeSide::Buy);
                // 1000 / 30000 = 0.0333.. floored to 0.03333
                assert_eq!(intent.quantity, "0.03333");
                assert_eq!(intent.notional, d("999.90000"));
            }
            other => panic!("expected execute, got {:?}", other),
        }
    }

    #[test]
    fn test_sell_spends_base_balance() {
        let executor = Executor::new(btc_limits());
        let balances = Balances {
            base: d("0.123456789"),
            quote: Decimal::ZERO,
        };

        let decision = executor
            .process_signal(Signal::Sell, &balances, d("40000"))
            .unwrap();

        match decision.action {
            ExecutionAction::Execute(intent) => {
                assert_eq!(intent.side, TradeSide::Sell);
                assert_eq!(intent.raw_quantity, d("0.123456789"));
                assert_eq!(intent.quantity, "0.12345");
            }
            other => panic!("expected execute, got {:?}", other),
        }
    }

    #[test]
    fn test_quantity_raised_to_min_qty() {
        let limits = TradingLimits {
            min_qty: d("0.001"),
            min_notional: d("1"),
            step_size: d("0.001"),
        };
        let executor = Executor::new(limits);
        let balances = Balances {
            base: Decimal::ZERO,
            quote: Decimal::ZERO,
        };

        let intent = executor
            .size_order(TradeSide::Sell, &balances, d("2000"))
            .unwrap();

        assert_eq!(intent.raw_quantity, d("0.001"));
        assert_eq!(intent.quantity, "0.001");
        assert_eq!(intent.notional, d("2.000"));
    }

    #[test]
    fn test_below_min_notional_is_skipped() {
        let limits = TradingLimits {
            min_qty: d("0.0001"),
            min_notional: d("10"),
            step_size: d("0.0001"),
        };
        let executor = Executor::new(limits);
        let balances = Balances {
            base: d("0.0001"),
            quote: Decimal::ZERO,
        };

        // 0.0001 * 50000 = 5 < 10
        let decision = executor
            .process_signal(Signal::Sell, &balances, d("50000"))
            .unwrap();

        assert!(matches!(decision.action, ExecutionAction::Skip));
        assert!(decision.reason.contains("below minimum"));
    }

    #[test]
    fn test_notional_exactly_at_minimum_executes() {
        let limits = TradingLimits {
            min_qty: d("0.0001"),
            min_notional: d("10"),
            step_size: d("0.0001"),
        };
        let executor = Executor::new(limits);
        let balances = Balances {
            base: d("0.0002"),
            quote: Decimal::ZERO,
        };

        let decision = executor
            .process_signal(Signal::Sell, &balances, d("50000"))
            .unwrap();

        assert!(matches!(decision.action, ExecutionAction::Execute(_)));
    }

    #[test]
    fn test_zero_price_is_an_error() {
        let executor = Executor::new(btc_limits());
        let balances = Balances {
            base: d("1"),
            quote: d("1"),
        };

        assert!(executor
            .process_signal(Signal::Buy, &balances, Decimal::ZERO)
            .is_err());
    }
}
