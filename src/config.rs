//! Layered settings: built-in defaults, optional TOML file, then `CROSSBOT_*`
//! environment variables (e.g. `CROSSBOT_EXCHANGE__API_KEY`).

use crate::error::BotError;
use crate::Result;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/crossbot";
const ENV_PREFIX: &str = "CROSSBOT";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub exchange: ExchangeSettings,
    pub market: MarketSettings,
    pub strategy: StrategySettings,
    pub runtime: RuntimeSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeSettings {
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub recv_window_ms: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketSettings {
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    /// Kline interval, e.g. "15m"
    pub interval: String,
    /// History loaded at start-up
    pub backfill_hours: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategySettings {
    pub fast_period: usize,
    pub slow_period: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeSettings {
    pub poll_interval_secs: u64,
    pub warmup_interval_secs: u64,
    pub fetch_attempts: u32,
    pub retry_delay_secs: u64,
    /// Cap on retained closes; unbounded when unset
    #[serde(default)]
    pub max_history: Option<usize>,
}

impl RuntimeSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn warmup_interval(&self) -> Duration {
        Duration::from_secs(self.warmup_interval_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Settings {
    /// Load settings from defaults, `path` (if it exists) and the environment
    pub fn load(path: &str) -> Result<Self> {
        let config = Self::builder()?
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Built-in defaults only, no file or environment
    pub fn defaults() -> Result<Self> {
        let settings: Settings = Self::builder()?.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(Config::builder()
            .set_default("exchange.base_url", crate::api::binance::BINANCE_API_BASE)?
            .set_default("exchange.api_key", "")?
            .set_default("exchange.api_secret", "")?
            .set_default("exchange.recv_window_ms", 60_000)?
            .set_default("exchange.request_timeout_secs", 30)?
            .set_default("market.symbol", "BTCUSDT")?
            .set_default("market.base_asset", "BTC")?
            .set_default("market.quote_asset", "USDT")?
            .set_default("market.interval", "15m")?
            .set_default("market.backfill_hours", 72)?
            .set_default("strategy.fast_period", 7)?
            .set_default("strategy.slow_period", 27)?
            .set_default("runtime.poll_interval_secs", 15)?
            .set_default("runtime.warmup_interval_secs", 10)?
            .set_default("runtime.fetch_attempts", 5)?
            .set_default("runtime.retry_delay_secs", 5)?)
    }

    pub fn validate(&self) -> Result<()> {
        let StrategySettings {
            fast_period,
            slow_period,
        } = self.strategy;

        if fast_period == 0 || fast_period >= slow_period {
            return Err(BotError::InvalidConfig(format!(
                "strategy.fast_period ({}) must be positive and below strategy.slow_period ({})",
                fast_period, slow_period
            )));
        }
        if self.runtime.fetch_attempts == 0 {
            return Err(BotError::InvalidConfig(
                "runtime.fetch_attempts must be at least 1".to_string(),
            ));
        }
        if let Some(max_history) = self.runtime.max_history {
            if max_history < slow_period + 1 {
                return Err(BotError::InvalidConfig(format!(
                    "runtime.max_history ({}) must hold at least slow_period + 1 ({}) closes",
                    max_history,
                    slow_period + 1
                )));
            }
        }
        if self.market.symbol.is_empty() {
            return Err(BotError::InvalidConfig("market.symbol is empty".to_string()));
        }

        Ok(())
    }
}
