pub mod binance;

pub use binance::BinanceClient;

use crate::models::{Candle, OrderConfirmation, TradeSide, TradingLimits};
use crate::Result;
use async_trait::async_trait;
use chrono::Duration;
use rust_decimal::Decimal;

/// Exchange operations the trading loop depends on - can be mocked for testing
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Lot size and notional limits for a symbol
    async fn symbol_limits(&self, symbol: &str) -> Result<TradingLimits>;

    /// Candles covering the last `lookback`, oldest first
    async fn historical_candles(
        &self,
        symbol: &str,
        interval: &str,
        lookback: Duration,
    ) -> Result<Vec<Candle>>;

    /// The `count` most recent candles, oldest first; the last one is still forming
    async fn latest_candles(&self, symbol: &str, interval: &str, count: usize)
        -> Result<Vec<Candle>>;

    /// Free balance of an asset
    async fn balance(&self, asset: &str) -> Result<Decimal>;

    /// Last traded price
    async fn current_price(&self, symbol: &str) -> Result<Decimal>;

    /// Place a market order; `quantity` is already quantized to the step size
    async fn submit_market_order(
        &self,
        symbol: &str,
        side: TradeSide,
        quantity: &str,
    ) -> Result<OrderConfirmation>;
}
