use crate::api::Exchange;
use crate::config::{MarketSettings, RuntimeSettings, Settings};
use crate::error::BotError;
use crate::execution::{
    ExecutionAction, Executor, PriceHistory, ResilientFetcher, LATEST_CANDLE_COUNT,
};
use crate::models::{Balances, Candle, OrderConfirmation, OrderIntent, Signal, TradingLimits};
use crate::strategy::{Crossover, CrossoverStrategy, Evaluation, MovingAverages, Trend, Trigger};
use crate::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Duration;
use tokio::time::sleep;

/// Mutable state carried from one iteration to the next
#[derive(Debug, Clone)]
pub struct LoopState {
    pub history: PriceHistory,
    /// Cleared after the first evaluation with enough history
    pub first_run: bool,
}

impl LoopState {
    pub fn new(history: PriceHistory) -> Self {
        Self {
            history,
            first_run: true,
        }
    }
}

/// Snapshot emitted on every evaluated iteration
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub timestamp: DateTime<Utc>,
    pub balances: Balances,
    pub price: Decimal,
    pub averages: MovingAverages,
    pub trend: Trend,
}

#[derive(Debug, Clone)]
pub enum OrderOutcome {
    Submitted {
        intent: OrderIntent,
        confirmation: OrderConfirmation,
    },
    Skipped {
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub enum IterationOutcome {
    /// History still shorter than the strategy needs
    Warmup { have: usize, need: usize },
    Evaluated {
        report: StatusReport,
        signal: Signal,
        trigger: Option<Trigger>,
        order: Option<OrderOutcome>,
    },
}

/// Fetch / evaluate / act loop for a single pair
pub struct TradingLoop<E: Exchange> {
    exchange: E,
    market: MarketSettings,
    runtime: RuntimeSettings,
    strategy: CrossoverStrategy,
    fetcher: ResilientFetcher,
    executor: Executor,
}

impl<E: Exchange> TradingLoop<E> {
    pub fn new(exchange: E, settings: &Settings, limits: TradingLimits) -> Result<Self> {
        let strategy =
            CrossoverStrategy::new(settings.strategy.fast_period, settings.strategy.slow_period)?;
        let fetcher = ResilientFetcher::new(
            settings.runtime.fetch_attempts,
            settings.runtime.retry_delay(),
        );

        Ok(Self {
            exchange,
            market: settings.market.clone(),
            runtime: settings.runtime.clone(),
            strategy,
            fetcher,
            executor: Executor::new(limits),
        })
    }

    /// Fetch trading limits and backfill history
    ///
    /// Failing to fetch limits is fatal: no order can be sized without them.
    /// A failed backfill only means a longer warm-up.
    pub async fn initialize(exchange: E, settings: &Settings) -> Result<(Self, LoopState)> {
        let symbol = &settings.market.symbol;
        let limits = exchange.symbol_limits(symbol).await?;
        tracing::info!(
            symbol = %symbol,
            min_qty = %limits.min_qty,
            min_notional = %limits.min_notional,
            step_size = %limits.step_size,
            "✅ Trading limits loaded"
        );

        let trading_loop = Self::new(exchange, settings, limits)?;
        let state = trading_loop.backfill().await;
        Ok((trading_loop, state))
    }

    /// Load historical closes, skipping the newest kline which is still forming
    pub async fn backfill(&self) -> LoopState {
        let mut history = match self.runtime.max_history {
            Some(max_len) => PriceHistory::bounded(max_len),
            None => PriceHistory::new(),
        };

        tracing::info!("🔄 Loading historical candles...");
        let lookback = chrono::Duration::hours(self.market.backfill_hours as i64);
        match self
            .exchange
            .historical_candles(&self.market.symbol, &self.market.interval, lookback)
            .await
        {
            Ok(candles) => {
                let closed = candles.len().saturating_sub(1);
                for candle in &candles[..closed] {
                    history.append(candle);
                }
                tracing::info!(count = history.len(), "✅ Loaded historical candles");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Backfill failed, starting with empty history");
            }
        }

        LoopState::new(history)
    }

    pub fn limits(&self) -> &TradingLimits {
        self.executor.limits()
    }

    /// Run forever; only process termination stops the loop
    pub async fn run(&self, mut state: LoopState) {
        tracing::info!(
            symbol = %self.market.symbol,
            fast = self.strategy.fast_period(),
            slow = self.strategy.slow_period(),
            "💹 Trading loop starting"
        );

        loop {
            let pause = self.tick(&mut state).await;
            sleep(pause).await;
        }
    }

    /// One iteration with errors absorbed; returns how long to wait before the next
    pub async fn tick(&self, state: &mut LoopState) -> Duration {
        match self.run_iteration(state).await {
            Ok(IterationOutcome::Warmup { .. }) => self.runtime.warmup_interval(),
            Ok(IterationOutcome::Evaluated { .. }) => self.runtime.poll_interval(),
            Err(e) => {
                report_error(&e);
                self.runtime.poll_interval()
            }
        }
    }

    /// Fetch the latest closed candle, evaluate, and act on the signal
    pub async fn run_iteration(&self, state: &mut LoopState) -> Result<IterationOutcome> {
        let candles = self
            .fetcher
            .fetch_latest(&self.exchange, &self.market.symbol, &self.market.interval)
            .await?;
        let closed = closed_candle(&candles)?;

        if state.history.append(closed) {
            tracing::debug!(timestamp = closed.timestamp, close = %closed.close, "New closed candle");
        }

        let crossover = match self.strategy.evaluate(state.history.closes(), state.first_run) {
            Evaluation::InsufficientData { have, need } => {
                tracing::info!(have, need, "⚠️ Not enough data, waiting...");
                return Ok(IterationOutcome::Warmup { have, need });
            }
            Evaluation::Ready(crossover) => crossover,
        };

        let balances = Balances {
            base: self.exchange.balance(&self.market.base_asset).await?,
            quote: self.exchange.balance(&self.market.quote_asset).await?,
        };
        let price = self.exchange.current_price(&self.market.symbol).await?;
        // Cleared before the order goes out: a rejected first-run buy is not retried
        state.first_run = false;

        let report = StatusReport {
            timestamp: Utc::now(),
            balances,
            price,
            averages: crossover.averages,
            trend: crossover.averages.trend(),
        };
        self.log_status(&report);

        let order = match crossover.signal {
            Signal::Hold => None,
            Signal::Buy | Signal::Sell => Some(self.execute(&crossover, &balances, price).await?),
        };

        Ok(IterationOutcome::Evaluated {
            report,
            signal: crossover.signal,
            trigger: crossover.trigger,
            order,
        })
    }

    async fn execute(
        &self,
        crossover: &Crossover,
        balances: &Balances,
        price: Decimal,
    ) -> Result<OrderOutcome> {
        let decision = self
            .executor
            .process_signal(crossover.signal, balances, price)?;

        match decision.action {
            ExecutionAction::Skip => {
                tracing::warn!(
                    signal = ?crossover.signal,
                    trigger = ?crossover.trigger,
                    reason = %decision.reason,
                    "⏭️ Order skipped"
                );
                Ok(OrderOutcome::Skipped {
                    reason: decision.reason,
                })
            }
            ExecutionAction::Execute(intent) => {
                tracing::info!(
                    side = %intent.side,
                    trigger = ?crossover.trigger,
                    quantity = %intent.quantity,
                    notional = %intent.notional,
                    "📤 Submitting market order"
                );

                let confirmation = self
                    .exchange
                    .submit_market_order(&self.market.symbol, intent.side, &intent.quantity)
                    .await?;

                tracing::info!(
                    side = %intent.side,
                    order_id = confirmation.order_id,
                    status = %confirmation.status,
                    executed_qty = %confirmation.executed_qty,
                    "✅ Order submitted"
                );

                Ok(OrderOutcome::Submitted {
                    intent,
                    confirmation,
                })
            }
        }
    }

    fn log_status(&self, report: &StatusReport) {
        let trend = match report.trend {
            Trend::Rising => "📈 Rising",
            Trend::Falling => "📉 Falling",
        };

        tracing::info!(
            base_balance = %report.balances.base,
            quote_balance = %report.balances.quote,
            price = %report.price,
            fast_ma = %report.averages.fast_curr.round_dp(2),
            slow_ma = %report.averages.slow_curr.round_dp(2),
            "🔹 {} | {} {} | {} {} | {}",
            report.timestamp.format("%Y-%m-%d %H:%M:%S"),
            report.balances.quote.round_dp(2),
            self.market.quote_asset,
            report.balances.base,
            self.market.base_asset,
            trend
        );
    }
}

/// The newest kline is still forming; the one before it is the last closed
fn closed_candle(candles: &[Candle]) -> Result<&Candle> {
    if candles.len() < LATEST_CANDLE_COUNT {
        return Err(BotError::Unclassified(format!(
            "Expected {} candles, got {}",
            LATEST_CANDLE_COUNT,
            candles.len()
        )));
    }
    Ok(&candles[candles.len() - 2])
}

fn report_error(e: &BotError) {
    match e {
        BotError::Provider { status, code, msg } => {
            tracing::error!(status, code, msg = %msg, "❌ Exchange API error");
        }
        BotError::FetchExhausted { attempts, .. } => {
            tracing::error!(attempts, error = %e, "❌ Exchange unreachable, skipping iteration");
        }
        other => {
            tracing::warn!(error = %other, "⚠️ Iteration failed");
        }
    }
}
