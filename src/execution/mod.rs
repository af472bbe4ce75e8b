// Order sizing, data collection and the trading loop
pub mod executor;
pub mod fetcher;
pub mod price_history;
pub mod quantizer;
pub mod trading_loop;

pub use executor::{ExecutionAction, ExecutionDecision, Executor};
pub use fetcher::{ResilientFetcher, LATEST_CANDLE_COUNT};
pub use price_history::PriceHistory;
pub use quantizer::{floor_to_step, quantize};
pub use trading_loop::{IterationOutcome, LoopState, OrderOutcome, StatusReport, TradingLoop};
