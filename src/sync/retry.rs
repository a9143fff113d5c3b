//! Retry with exponential backoff
//!
//! - Every attempt is bounded by `fetch_timeout_ms`; a timeout is transient
//! - Only transient failures are retried
//! - Delay doubles (by `multiplier`) from `initial_backoff_ms` up to
//!   `max_backoff_ms`, plus up to 10% random jitter

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::errors::RemoteError;
use crate::observability::Event;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
    pub fetch_timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 200,
            max_backoff_ms: 10_000,
            multiplier: 2.0,
            fetch_timeout_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("sync.max_attempts must be at least 1".to_string());
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(format!(
                "sync.multiplier must be at least 1.0 (got {})",
                self.multiplier
            ));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err("sync.initial_backoff_ms must not exceed sync.max_backoff_ms".to_string());
        }
        if self.fetch_timeout_ms == 0 {
            return Err("sync.fetch_timeout_ms must be at least 1".to_string());
        }
        Ok(())
    }

    /// Delay before retry number `retry` (1-based), without jitter.
    pub fn base_delay(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(63) as i32;
        let raw = self.initial_backoff_ms as f64 * self.multiplier.powi(exp);
        Duration::from_millis(raw.min(self.max_backoff_ms as f64) as u64)
    }

    fn jittered_delay(&self, retry: u32) -> Duration {
        let base = self.base_delay(retry);
        let jitter_cap = base.as_millis() as u64 / 10;
        if jitter_cap == 0 {
            return base;
        }
        base + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_cap))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// Returns the last error on exhaustion.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, RemoteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = match tokio::time::timeout(self.fetch_timeout(), op()).await {
                Ok(result) => result,
                Err(_) => Err(RemoteError::Timeout(self.fetch_timeout_ms)),
            };
            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = self.jittered_delay(attempt);
                    debug!(
                        event = Event::SyncRetry.as_str(),
                        what,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying remote call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
            multiplier: 2.0,
            fetch_timeout_ms: 50,
        }
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.base_delay(1), Duration::from_millis(200));
        assert_eq!(policy.base_delay(2), Duration::from_millis(400));
        assert_eq!(policy.base_delay(3), Duration::from_millis(800));
        assert_eq!(policy.base_delay(20), Duration::from_millis(10_000));
    }

    #[test]
    fn test_jitter_within_ten_percent() {
        let policy = RetryPolicy::default();
        for _ in 0..50 {
            let d = policy.jittered_delay(2).as_millis();
            assert!((400..=440).contains(&d));
        }
    }

    #[tokio::test]
    async fn test_transient_then_success() {
        let calls = AtomicU32::new(0);
        let result = fast()
            .run("probe", || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(RemoteError::Transient("reset".into()))
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast()
            .run("probe", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RemoteError::Transient("down".into()))
            })
            .await;
        assert!(matches!(result, Err(RemoteError::Transient(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast()
            .run("probe", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RemoteError::NotFound("S1".into()))
            })
            .await;
        assert!(matches!(result, Err(RemoteError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_call_times_out() {
        let result: Result<(), _> = fast()
            .run("probe", || async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok(())
            })
            .await;
        assert_eq!(result, Err(RemoteError::Timeout(50)));
    }

    #[test]
    fn test_validate() {
        assert!(RetryPolicy::default().validate().is_ok());
        let bad = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert!(bad.validate().is_err());
    }
}
