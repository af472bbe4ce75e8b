use crate::models::Candle;
use rust_decimal::Decimal;

/// Ordered, timestamp-deduplicated closing prices for the traded pair
///
/// Owned by the trading loop; no locking because nothing else touches it.
#[derive(Debug, Clone, Default)]
pub struct PriceHistory {
    closes: Vec<Decimal>,
    last_timestamp: Option<i64>,
    max_len: Option<usize>,
}

impl PriceHistory {
    /// Create an unbounded history
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history that keeps only the newest `max_len` closes
    pub fn bounded(max_len: usize) -> Self {
        Self {
            max_len: Some(max_len),
            ..Self::default()
        }
    }

    /// Append a candle's close
    ///
    /// Returns `false` (and changes nothing) when the candle is not newer
    /// than the last appended one.
    pub fn append(&mut self, candle: &Candle) -> bool {
        if let Some(last) = self.last_timestamp {
            if candle.timestamp <= last {
                return false;
            }
        }

        self.closes.push(candle.close);
        self.last_timestamp = Some(candle.timestamp);

        if let Some(max_len) = self.max_len {
            if self.closes.len() > max_len {
                let excess = self.closes.len() - max_len;
                self.closes.drain(..excess);
            }
        }

        true
    }

    /// Closes in time order, oldest first
    pub fn closes(&self) -> &[Decimal] {
        &self.closes
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.last_timestamp
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }
}
