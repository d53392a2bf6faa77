//! Timeout and retry combinators
//!
//! The timeout wrapper races a future against `tokio::time::sleep`. The
//! losing future is dropped, which aborts any in-flight `reqwest` request
//! it owns.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{GatewayError, GatewayResult};

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Retry parameters: total attempts and exponential backoff base
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_RETRY_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before attempt `attempt + 1`, where `attempt` is 1-based
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exp)
    }
}

/// Per-tool call policy: timeout on every attempt, retry over the sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CALL_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

impl CallPolicy {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Self {
        Self { timeout, retry }
    }

    /// Same timeout, single attempt. Used for tools with side effects.
    pub fn single_attempt(&self) -> Self {
        Self {
            timeout: self.timeout,
            retry: RetryPolicy::once(),
        }
    }

    /// Run `op` under this policy
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> GatewayResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let timeout = self.timeout;
        with_retry(&self.retry, operation, || with_timeout(operation, timeout, op())).await
    }
}

/// Race `fut` against `after`; on expiry return `TimeoutError`
pub async fn with_timeout<T, Fut>(operation: &str, after: Duration, fut: Fut) -> GatewayResult<T>
where
    Fut: Future<Output = GatewayResult<T>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, timeout_ms = after.as_millis() as u64, "Operation timed out");
            Err(GatewayError::timeout(operation, after))
        }
    }
}

/// Invoke `op` up to `policy.max_attempts` times, sleeping
/// `base * 2^(attempt-1)` between attempts. Non-retryable errors return
/// immediately; after exhaustion the last error is returned.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> GatewayResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = GatewayResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = policy.delay_after(attempt);
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
