// Core modules
pub mod api;
pub mod config;
pub mod error;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod strategy;

// Re-export commonly used types
pub use api::{BinanceClient, Exchange};
pub use error::BotError;
pub use models::*;
pub use strategy::CrossoverStrategy;

// Error handling
pub type Result<T> = std::result::Result<T, BotError>;
