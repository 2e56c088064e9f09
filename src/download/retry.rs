//! Retry decisions for failed transfers.
//!
//! A failure is classified into a [`FailureType`]; the [`RetryPolicy`] then
//! decides whether the same message is attempted again.
//!
//! The default policy makes a single attempt per message: a rate limit is
//! waited out and the download moves on to the next message. Raising
//! `max_attempts` enables exponential backoff for transient failures, and
//! `retry_rate_limited` re-attempts rate-limited messages once the wait is
//! over (at least once, whatever `max_attempts` says).
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use tgmedia_core::download::{FailureType, RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::with_max_attempts(3);
//! match policy.should_retry(FailureType::Transient, 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         assert_eq!(attempt, 2);
//!         assert!(delay >= Duration::from_secs(1));
//!     }
//!     RetryDecision::DoNotRetry { reason } => panic!("{reason}"),
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

use super::TransferError;

/// Default number of attempts per message.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;

/// Upper bound accepted for `max_attempts` in configuration.
pub const MAX_CONFIGURABLE_ATTEMPTS: u32 = 10;

/// Default base delay for exponential backoff (1 second).
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default maximum delay cap (32 seconds).
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(32);

/// Default backoff multiplier (doubles each attempt).
const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;

/// Attempts granted to a rate-limited message when `retry_rate_limited` is
/// on, even if `max_attempts` is lower.
const MIN_RATE_LIMITED_ATTEMPTS: u32 = 2;

/// Maximum jitter added to delays (500ms).
const MAX_JITTER: Duration = Duration::from_millis(500);

/// Classification of transfer failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Timeouts and dropped connections.
    Transient,
    /// Local IO errors, rejected credentials, protocol errors.
    Permanent,
    /// The service rate limited us; the wait has been served already.
    RateLimited,
}

/// Decision on whether to attempt a message again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Attempt again after `delay`.
    Retry {
        /// How long to wait before the next attempt.
        delay: Duration,
        /// The upcoming attempt number (1-indexed).
        attempt: u32,
    },

    /// Give up on this message.
    DoNotRetry {
        /// Human-readable reason.
        reason: String,
    },
}

/// Retry behavior for the download loop.
///
/// # Delay Calculation
///
/// ```text
/// delay = min(base_delay * multiplier^(attempt-1), max_delay) + jitter
/// ```
///
/// Rate-limited retries use no extra delay since the service-requested wait
/// is slept before the decision is made.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f32,
    retry_rate_limited: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            retry_rate_limited: false,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with custom backoff settings.
    ///
    /// `max_attempts` counts the initial attempt and is raised to 1.
    #[must_use]
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f32,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            backoff_multiplier,
            retry_rate_limited: false,
        }
    }

    /// Creates a policy with a custom `max_attempts`, defaults otherwise.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Enables or disables re-attempting rate-limited messages.
    #[must_use]
    pub fn retry_rate_limited(mut self, enabled: bool) -> Self {
        self.retry_rate_limited = enabled;
        self
    }

    /// Maximum attempts per message, including the first.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether rate-limited messages are re-attempted.
    #[must_use]
    pub fn retries_rate_limited(&self) -> bool {
        self.retry_rate_limited
    }

    /// Decides what to do after `attempt` (1-indexed) failed.
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        match failure_type {
            FailureType::Permanent => {
                return RetryDecision::DoNotRetry {
                    reason: "permanent failure - retry would not help".to_string(),
                };
            }
            FailureType::RateLimited if !self.retry_rate_limited => {
                return RetryDecision::DoNotRetry {
                    reason: "rate limited - moving on after the wait".to_string(),
                };
            }
            FailureType::Transient | FailureType::RateLimited => {}
        }

        let limit = match failure_type {
            FailureType::RateLimited => self.max_attempts.max(MIN_RATE_LIMITED_ATTEMPTS),
            _ => self.max_attempts,
        };
        if attempt >= limit {
            debug!(attempt, max = limit, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({limit}) exhausted"),
            };
        }

        let delay = match failure_type {
            FailureType::RateLimited => Duration::ZERO,
            _ => self.calculate_delay(attempt),
        };
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let multiplier = f64::from(self.backoff_multiplier);
        let exponent = f64::from(attempt.saturating_sub(1));
        let delay_ms = base_ms * multiplier.powf(exponent);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);

        Duration::from_millis(capped_ms as u64) + calculate_jitter()
    }
}

#[allow(clippy::cast_possible_truncation)]
fn calculate_jitter() -> Duration {
    let mut rng = rand::thread_rng();
    Duration::from_millis(rng.gen_range(0..=MAX_JITTER.as_millis() as u64))
}

/// Classifies a transfer error for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | IO | Permanent |
/// | rate limit | RateLimited |
/// | timeout, network | Transient |
/// | anything else | Permanent |
#[must_use]
pub fn classify_error(error: &TransferError) -> FailureType {
    match error {
        TransferError::Io { .. } => FailureType::Permanent,
        TransferError::RateLimited { .. } => FailureType::RateLimited,
        TransferError::Unknown { source } if source.is_transient() => FailureType::Transient,
        TransferError::Unknown { .. } => FailureType::Permanent,
    }
}
