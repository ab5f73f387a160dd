//! Retry with exponential backoff for transient failures.
//!
//! Opening a database connection is the main user: a server that is still
//! starting, or a pool that is momentarily exhausted, should not fail an
//! installer run on the first attempt.
//!
//! # Example
//!
//! ```rust
//! use whippet_runtime::retry::{RetryPolicy, retry_with_predicate};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), String> {
//! let policy = RetryPolicy::builder()
//!     .max_retries(5)
//!     .initial_delay(Duration::from_millis(100))
//!     .max_delay(Duration::from_secs(10))
//!     .build();
//!
//! let value = retry_with_predicate(
//!     &policy,
//!     || async { Ok::<_, String>(42) },
//!     |err: &String| err.contains("timeout"),
//! )
//! .await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Retry policy configuration for exponential backoff.
///
/// # Default Values
///
/// - `max_retries`: 3
/// - `initial_delay`: 100ms
/// - `max_delay`: 30 seconds
/// - `multiplier`: 2.0 (delay doubles each retry)
/// - `jitter`: enabled
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Cap for the exponential delay
    pub max_delay: Duration,
    /// Growth factor between retries
    pub multiplier: f64,
    /// Scale each delay by a random factor in `0.5..=1.0`
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryPolicy {
    /// Create a new policy builder.
    #[must_use]
    pub const fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
            jitter: false,
        }
    }

    /// Delay before retry number `attempt` (zero-based), without jitter.
    ///
    /// `initial_delay * multiplier ^ attempt`, capped at `max_delay`.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )] // bounded by max_delay before the final cast
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let scaled = self.initial_delay.as_nanos() as f64 * self.multiplier.powi(exponent);
        if !scaled.is_finite() || scaled >= self.max_delay.as_nanos() as f64 {
            return self.max_delay;
        }
        Duration::from_nanos(scaled.max(0.0) as u64)
    }

    /// Delay before retry number `attempt`, with jitter when enabled.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if self.jitter {
            base.mul_f64(rand::thread_rng().gen_range(0.5..=1.0))
        } else {
            base
        }
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    max_retries: u32,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: bool,
}

impl RetryPolicyBuilder {
    /// Set maximum number of retries.
    #[must_use]
    pub const fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set initial delay before first retry.
    #[must_use]
    pub const fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set maximum delay (cap for exponential backoff).
    #[must_use]
    pub const fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set multiplier for exponential backoff.
    #[must_use]
    pub const fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Enable or disable jitter.
    #[must_use]
    pub const fn jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Build the [`RetryPolicy`].
    #[must_use]
    pub const fn build(self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: self.initial_delay,
            max_delay: self.max_delay,
            multiplier: self.multiplier,
            jitter: self.jitter,
        }
    }
}

/// Retry an async operation on every error.
///
/// # Errors
///
/// Returns the last error once `max_retries` retries are exhausted.
pub async fn retry_with_backoff<F, Fut, T, E>(policy: &RetryPolicy, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    retry_with_predicate(policy, operation, |_| true).await
}

/// Retry an async operation while `is_retryable` accepts the error.
///
/// # Errors
///
/// Returns the first non-retryable error immediately, or the last error once
/// `max_retries` retries are exhausted.
pub async fn retry_with_predicate<F, Fut, T, E, P>(
    policy: &RetryPolicy,
    mut operation: F,
    is_retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            },
            Err(err) if !is_retryable(&err) => {
                tracing::debug!(error = %err, "Error is not retryable");
                return Err(err);
            },
            Err(err) if attempt >= policy.max_retries => {
                tracing::error!(attempt, error = %err, "Operation failed after max retries");
                metrics::counter!("whippet_retry_exhausted_total").increment(1);
                return Err(err);
            },
            Err(err) => {
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "Operation failed, retrying"
                );
                metrics::counter!("whippet_retry_attempts_total").increment(1);
                sleep(delay).await;
                attempt += 1;
            },
        }
    }
}
