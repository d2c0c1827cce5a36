//! Shared retry-with-backoff primitive for vendor calls

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{VendorError, VendorFailure};

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the policy's exponential delay
    Retry,
    /// Retry after a vendor-supplied delay (still capped by the policy)
    RetryAfter(Duration),
    /// Give up immediately
    Fatal,
}

/// Default classification: transient failures retry, everything else is fatal
pub fn classify_vendor_error(error: &VendorError) -> RetryDecision {
    match error {
        VendorError::RateLimited { retry_after: Some(delay) } => RetryDecision::RetryAfter(*delay),
        other if other.is_transient() => RetryDecision::Retry,
        _ => RetryDecision::Fatal,
    }
}

/// Successful value together with the number of retries it took
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempted<T> {
    pub value: T,
    pub retries: u32,
}

/// Bounded attempts with exponential backoff
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Spread delays by up to 20% to avoid synchronized retries
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            jitter: true,
        }
    }

    /// Single attempt, no waiting
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Delay before retry number `retry` (0-based): `base * 2^retry`, capped
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn with_jitter(&self, delay: Duration) -> Duration {
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let spread = rand::thread_rng().gen_range(0.0..0.2);
        delay.mul_f64(1.0 + spread).min(self.max_delay.max(delay))
    }

    /// Run `operation` until it succeeds, hits a fatal error, or attempts run out
    pub async fn run<T, F, Fut, C>(&self, classify: C, mut operation: F) -> Result<Attempted<T>, VendorFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, VendorError>>,
        C: Fn(&VendorError) -> RetryDecision,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut retries = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(Attempted { value, retries }),
                Err(error) => {
                    let decision = classify(&error);
                    let attempts_made = retries + 1;

                    if decision == RetryDecision::Fatal {
                        debug!("Fatal vendor error, not retrying: {}", error);
                        return Err(VendorFailure { error, retries });
                    }
                    if attempts_made >= max_attempts {
                        warn!("Giving up after {} attempts: {}", attempts_made, error);
                        return Err(VendorFailure { error, retries });
                    }

                    let delay = match decision {
                        RetryDecision::RetryAfter(hint) => hint.min(self.max_delay),
                        _ => self.with_jitter(self.delay_for(retries)),
                    };
                    warn!(
                        "Attempt {}/{} failed ({}), retrying in {}ms",
                        attempts_made,
                        max_attempts,
                        error,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    retries += 1;
                }
            }
        }
    }
}
