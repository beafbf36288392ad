//! Retry with exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use authsync_core::error::{TransportError, is_retryable_status};
use authsync_core::{HttpRequest, HttpResponse, Transport};

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts per call, the first one included.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on every further retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Add up to half of the current delay on top of it.
    pub jitter: bool,
    /// Abandon a single attempt after this long.
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            jitter: true,
            attempt_timeout: Some(Duration::from_secs(10)),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Calculate the delay before retry number `attempt` (0-indexed).
    ///
    /// Jitter only ever adds, and never more than half the exponential step,
    /// so successive delays are non-decreasing.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        let step_ms = base_ms.saturating_mul(2u64.saturating_pow(attempt));
        let jitter_ms = if self.jitter && step_ms > 1 {
            rand::thread_rng().gen_range(0..=step_ms / 2)
        } else {
            0
        };

        Duration::from_millis(step_ms.saturating_add(jitter_ms)).min(self.max_delay)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// A transport that retries transient failures of an inner transport.
///
/// Non-success responses are turned into [`TransportError::Status`]. 5xx
/// and 429 responses, connection failures and timeouts are retried up to
/// [`RetryPolicy::max_attempts`] times; everything else is returned after
/// the first attempt. A 2xx response is a success even if its body carries
/// a provider error.
///
/// Attempt state lives inside each `send` future, so one instance can serve
/// any number of concurrent calls. Dropping the future abandons the current
/// attempt and schedules no further ones.
#[derive(Debug, Clone)]
pub struct RetryingTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: Transport> RetryingTransport<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    async fn attempt(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let result = match self.policy.attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.inner.send(request)).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout {
                    duration_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                }),
            },
            None => self.inner.send(request).await,
        };

        let response = result?;
        if response.status >= 400 || is_retryable_status(response.status) {
            return Err(TransportError::Status {
                status: response.status,
                body: response.text(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl<T: Transport> Transport for RetryingTransport<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let max_attempts = self.policy.attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match self.attempt(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => err,
            };

            if attempt >= max_attempts {
                return Err(TransportError::Exhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            tokio::time::sleep(self.policy.delay_for_attempt(attempt - 1)).await;
        }
    }
}
