//! Retry logic with exponential backoff

use std::time::Duration;
use anyhow::Result;
use tracing::warn;
use crate::errors::{EngineError, EngineResult};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential_base: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            exponential_base: 2.0,
        }
    }
}

pub async fn retry_with_backoff<F, Fut, T>(
    operation: F,
    config: &RetryConfig,
    context: &str,
) -> EngineResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay_ms;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt >= config.max_attempts.max(1) => {
                return Err(EngineError::Network {
                    message: format!("{} failed after {} attempts", context, attempt),
                    source: Some(e),
                    retry_count: attempt,
                });
            }
            Err(e) => {
                warn!(
                    "Attempt {}/{} failed for {}: {}. Retrying in {}ms...",
                    attempt, config.max_attempts, context, e, delay
                );

                tokio::time::sleep(Duration::from_millis(delay)).await;

                delay = (delay as f64 * config.exponential_base) as u64;
                delay = delay.min(config.max_delay_ms);
                let jitter = (delay as f64 * 0.1 * (rand::random::<f64>() - 0.5)) as i64;
                delay = delay.saturating_add_signed(jitter);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 1,
            max_delay_ms: 2,
            exponential_base: 2.0,
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let value = retry_with_backoff(
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(anyhow::anyhow!("flaky"))
                } else {
                    Ok(7)
                }
            },
            &fast(),
            "flaky op",
        )
        .await
        .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn reports_retry_count_when_exhausted() {
        let result: EngineResult<()> =
            retry_with_backoff(|| async { Err(anyhow::anyhow!("down")) }, &fast(), "dead op").await;
        match result {
            Err(EngineError::Network { retry_count, .. }) => assert_eq!(retry_count, 3),
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }
}
