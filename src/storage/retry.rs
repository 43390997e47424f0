use crate::{PortalError, Result};
use tokio::time::{sleep, Duration};
use tracing::warn;

/// Delay schedule between attempts. `attempt` is the 1-based number of the attempt that just
/// failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `min(initial * 2^(attempt-1), max)`
    Exponential { initial: Duration, max: Duration },
    /// `min(step * attempt, max)`
    Linear { step: Duration, max: Duration },
}

impl Backoff {
    pub fn delay(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match *self {
            Backoff::Exponential { initial, max } => {
                let factor = 2u32.checked_pow(attempt - 1).unwrap_or(u32::MAX);
                initial.checked_mul(factor).unwrap_or(max).min(max)
            }
            Backoff::Linear { step, max } => step.checked_mul(attempt).unwrap_or(max).min(max),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    max_attempts: u32,
    backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::single_object()
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Three attempts, 1s doubling up to 5s.
    pub fn single_object() -> Self {
        Self::new(
            3,
            Backoff::Exponential {
                initial: Duration::from_millis(1000),
                max: Duration::from_millis(5000),
            },
        )
    }

    /// Two whole-manifest attempts, 2s per attempt up to 5s.
    pub fn chunked_manifest() -> Self {
        Self::new(
            2,
            Backoff::Linear {
                step: Duration::from_millis(2000),
                max: Duration::from_millis(5000),
            },
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }
}

/// Runs `operation` until it succeeds or `max_attempts` is reached, sleeping per the backoff in
/// between. The operation receives the 1-based attempt number. The final failure is wrapped in
/// [`PortalError::RetriesExhausted`].
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, mut operation: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match operation(attempt).await {
            Ok(result) => return Ok(result),
            Err(e) if attempt >= config.max_attempts => {
                return Err(PortalError::RetriesExhausted {
                    attempts: attempt,
                    source: Box::new(e),
                });
            }
            Err(e) => {
                let delay = config.backoff.delay(attempt);
                warn!(
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "attempt failed, retrying"
                );
                sleep(delay).await;
            }
        }
    }
}
