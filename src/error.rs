//! Error taxonomy for the trading bot

use thiserror::Error;

/// Errors surfaced by the exchange client, the fetcher and the trading loop
///
/// Only startup failures are fatal; every variant raised inside an
/// iteration is caught at the loop boundary.
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    #[error("Candle fetch failed after {attempts} attempts: {last_error}")]
    FetchExhausted { attempts: u32, last_error: String },

    #[error("Exchange rejected request (HTTP {status}, code {code}): {msg}")]
    Provider { status: u16, code: i64, msg: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Decimal error: {0}")]
    Decimal(#[from] rust_decimal::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Unclassified(String),
}

impl BotError {
    /// Whether a retry of the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, BotError::TransientNetwork(_))
    }
}

impl From<reqwest::Error> for BotError {
    /// Connect, timeout, send and body-read failures are transient;
    /// builder and decode failures are not
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() || e.is_request() || e.is_body() {
            BotError::TransientNetwork(e.to_string())
        } else {
            BotError::Unclassified(e.to_string())
        }
    }
}

impl From<String> for BotError {
    fn from(msg: String) -> Self {
        BotError::Unclassified(msg)
    }
}

impl From<&str> for BotError {
    fn from(msg: &str) -> Self {
        BotError::Unclassified(msg.to_string())
    }
}
