//! Retry and timeout policy for store calls.

use std::future::Future;
use std::time::Duration;

use inventory_store::StoreError;

/// Bounds on how long and how often the workflow talks to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
    call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(50),
            call_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` is raised to at least one.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            ..Self::default()
        }
    }

    /// Sets the upper bound for each individual store call.
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Delay before the attempt following `attempt` (linear backoff).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }

    /// Runs a store call under the call timeout.
    pub async fn call<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.call_timeout, fut)
            .await
            .unwrap_or_else(|_| Err(StoreError::Timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.call_timeout(), Duration::from_secs(10));
        assert_eq!(policy.delay_after(1), Duration::from_millis(50));
        assert_eq!(policy.delay_after(2), Duration::from_millis(100));
    }

    #[test]
    fn test_at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }

    #[tokio::test]
    async fn test_call_passes_result_through() {
        let policy = RetryPolicy::default();
        let value = policy.call(async { Ok::<_, StoreError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_call_times_out() {
        let policy = RetryPolicy::default().with_call_timeout(Duration::from_millis(10));
        let result = policy
            .call(async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<_, StoreError>(())
            })
            .await;
        assert!(matches!(result, Err(StoreError::Timeout)));
    }
}
