use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A closed (or forming) kline reduced to what the strategy consumes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    /// Open time in milliseconds since the epoch
    pub timestamp: i64,
    pub close: Decimal,
}

/// Exchange-imposed order constraints, fetched once at startup
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TradingLimits {
    pub min_qty: Decimal,
    pub min_notional: Decimal,
    pub step_size: Decimal,
}

/// Trading signal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
    /// No crossover, nothing to do
    Hold,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    /// Wire representation used by the exchange
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sized order, built and consumed within one loop iteration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderIntent {
    pub side: TradeSide,
    pub raw_quantity: Decimal,
    /// Quantity floored to the step size, rendered with the step's precision
    pub quantity: String,
    pub notional: Decimal,
}

/// Free balances of both legs of the traded pair
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Balances {
    pub base: Decimal,
    pub quote: Decimal,
}

/// Exchange acknowledgement of a submitted order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderConfirmation {
    pub order_id: i64,
    pub client_order_id: String,
    pub status: String,
    pub executed_qty: Decimal,
}
