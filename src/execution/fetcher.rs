use crate::api::Exchange;
use crate::error::BotError;
use crate::models::Candle;
use crate::Result;
use std::future::Future;
use tokio::time::{sleep, Duration};

/// Candles requested per poll: the last closed one and the one still forming
pub const LATEST_CANDLE_COUNT: usize = 2;

/// Wraps network reads with bounded retry and a fixed backoff
///
/// Only transient (connection-level) failures are retried; exchange
/// rejections and other errors return immediately.
#[derive(Debug, Clone)]
pub struct ResilientFetcher {
    max_attempts: u32,
    retry_delay: Duration,
}

impl ResilientFetcher {
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Fetch the two most recent candles
    pub async fn fetch_latest<E: Exchange + ?Sized>(
        &self,
        exchange: &E,
        symbol: &str,
        interval: &str,
    ) -> Result<Vec<Candle>> {
        self.retry(|| exchange.latest_candles(symbol, interval, LATEST_CANDLE_COUNT))
            .await
    }

    /// Run `op` until it succeeds, fails non-transiently, or attempts run out
    pub async fn retry<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "✓ Fetch succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() => {
                    last_error = e.to_string();

                    if attempt == self.max_attempts {
                        tracing::warn!(
                            attempt,
                            max_attempts = self.max_attempts,
                            error = %e,
                            "⚠️ Connection error, giving up"
                        );
                        break;
                    }

                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "⚠️ Connection error, retrying in {:?}",
                        self.retry_delay
                    );
                    sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(BotError::FetchExhausted {
            attempts: self.max_attempts,
            last_error,
        })
    }
}

impl Default for ResilientFetcher {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fetcher(attempts: u32) -> ResilientFetcher {
        ResilientFetcher::new(attempts, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let calls = &AtomicU32::new(0);

        let result = fetcher(5)
            .retry(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, BotError>(42)
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let calls = &AtomicU32::new(0);

        let result = fetcher(5)
            .retry(|| async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(BotError::TransientNetwork("connection reset".into()))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_after_max_attempts() {
        let calls = &AtomicU32::new(0);

        let result: Result<()> = fetcher(5)
            .retry(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(BotError::TransientNetwork("connection refused".into()))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        match result {
            Err(BotError::FetchExhausted {
                attempts,
                last_error,
            }) => {
                assert_eq!(attempts, 5);
                assert!(last_error.contains("connection refused"));
            }
            other => panic!("expected FetchExhausted, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_delay_after_final_attempt() {
        let calls = &AtomicU32::new(0);
        let fetcher = ResilientFetcher::new(2, Duration::from_secs(60));
        let started = tokio::time::Instant::now();

        let result: Result<()> = fetcher
            .retry(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(BotError::TransientNetwork("connection reset by peer".into()))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(result, Err(BotError::FetchExhausted { attempts: 2, .. })));
        // One delay between the two attempts, none after the last
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(60) && elapsed < Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_provider_error_not_retried() {
        let calls = &AtomicU32::new(0);

        let result: Result<()> = fetcher(5)
            .retry(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(BotError::Provider {
                    status: 400,
                    code: -1121,
                    msg: "Invalid symbol.".into(),
                })
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(BotError::Provider { .. })));
    }

    #[test]
    fn test_zero_attempts_means_one() {
        assert_eq!(fetcher(0).max_attempts(), 1);
    }
}
