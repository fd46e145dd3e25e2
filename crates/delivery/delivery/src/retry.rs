//! Bounded retries with backoff.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::caller::WebhookCaller;
use crate::error::DeliveryResult;
use crate::payload::{CallOptions, DeliveryPayload, TestResult};

/// Trait for retry backoff strategies.
pub trait RetryStrategy: Send + Sync {
    /// Delay inserted after `attempt` completed attempts, before the next one.
    fn delay(&self, attempt: u32) -> Duration;
}

/// Exponential backoff: base * 2^attempt, capped at `max_delay`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Base delay.
    pub base: Duration,
    /// Maximum delay cap.
    pub max_delay: Duration,
}

impl ExponentialBackoff {
    /// Creates a new exponential backoff strategy.
    pub fn new() -> Self {
        Self {
            base: Duration::from_secs(1),
            max_delay: Duration::from_secs(3600), // 1 hour
        }
    }

    /// Sets the base delay.
    pub fn base(mut self, base: Duration) -> Self {
        self.base = base;
        self
    }

    /// Sets the maximum delay.
    pub fn max_delay(mut self, max: Duration) -> Self {
        self.max_delay = max;
        self
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryStrategy for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let multiplier = 2_u64.saturating_pow(attempt);
        let delay = self.base.saturating_mul(multiplier.min(u32::MAX as u64) as u32);
        std::cmp::min(delay, self.max_delay)
    }
}

/// Runs `operation` up to `attempts + 1` times.
///
/// After attempt `k` produces a result `retryable` accepts, waits
/// `backoff(k)` and runs the operation again. Returns the last result.
pub async fn retry_with_backoff<T, F, Fut, B, C>(
    mut operation: F,
    attempts: u32,
    backoff: B,
    retryable: C,
) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = T>,
    B: Fn(u32) -> Duration,
    C: Fn(&T) -> bool,
{
    let mut result = operation().await;
    for attempt in 1..=attempts {
        if !retryable(&result) {
            return result;
        }
        tokio::time::sleep(backoff(attempt)).await;
        result = operation().await;
    }
    result
}

/// Which outcomes a retrying call is allowed to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Interactive test calls: a completed HTTP response is final, only
    /// timeouts and connection-level failures are retried.
    TestCall,
    /// Operator-driven redelivery: any non-success outcome is retried,
    /// including completed non-2xx responses.
    Redelivery,
}

impl RetryPolicy {
    /// Checks whether an outcome should be retried under this policy.
    pub fn should_retry(&self, result: &TestResult) -> bool {
        match self {
            RetryPolicy::TestCall => result.is_retryable(),
            RetryPolicy::Redelivery => !result.succeeded(),
        }
    }
}

/// Outcome of a retried call.
#[derive(Debug, Clone)]
pub struct CallReport {
    /// Final classified result.
    pub result: TestResult,
    /// Attempts actually made (1 when no retry fired).
    pub attempts: u32,
}

/// Wraps [`WebhookCaller`] with bounded retries.
pub struct RetryCoordinator<R: RetryStrategy = ExponentialBackoff> {
    caller: WebhookCaller,
    strategy: R,
}

impl RetryCoordinator<ExponentialBackoff> {
    /// Creates a coordinator with the default exponential backoff.
    pub fn new(caller: WebhookCaller) -> Self {
        Self {
            caller,
            strategy: ExponentialBackoff::new(),
        }
    }
}

impl<R: RetryStrategy> RetryCoordinator<R> {
    /// Creates a coordinator with a custom backoff strategy.
    pub fn with_strategy(caller: WebhookCaller, strategy: R) -> Self {
        Self { caller, strategy }
    }

    /// Calls an endpoint under the test-call policy.
    pub async fn call(
        &self,
        url: &str,
        secret: Option<&str>,
        payload: &DeliveryPayload,
        options: &CallOptions,
    ) -> DeliveryResult<TestResult> {
        self.call_with_policy(url, secret, payload, options, RetryPolicy::TestCall)
            .await
            .map(|report| report.result)
    }

    /// Calls an endpoint, retrying per `policy` within the options budget.
    pub async fn call_with_policy(
        &self,
        url: &str,
        secret: Option<&str>,
        payload: &DeliveryPayload,
        options: &CallOptions,
        policy: RetryPolicy,
    ) -> DeliveryResult<CallReport> {
        let attempts_made = AtomicU32::new(0);

        let result = retry_with_backoff(
            || {
                attempts_made.fetch_add(1, Ordering::Relaxed);
                self.caller.call(url, secret, payload, options)
            },
            options.retry_attempts,
            |attempt| self.strategy.delay(attempt),
            |result: &DeliveryResult<TestResult>| match result {
                Ok(outcome) => policy.should_retry(outcome),
                // Validation errors are rejected before any network I/O.
                Err(_) => false,
            },
        )
        .await?;

        Ok(CallReport {
            result,
            attempts: attempts_made.load(Ordering::Relaxed),
        })
    }

    /// Gets the caller.
    pub fn caller(&self) -> &WebhookCaller {
        &self.caller
    }
}
