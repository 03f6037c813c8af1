//! Retry policy for adapter requests.

use farescout_core::FailureKind;
use std::time::Duration;

use crate::deadline::Deadline;
use crate::error::FetchError;

/// Backoff policy applied to retryable failures.
///
/// Transient network failures retry at most twice with exponential
/// backoff; expired auth retries once after a token refresh; everything
/// else fails the attempt immediately.
#[derive(Debug, Clone)]
pub struct RetryStrategy {
    /// Maximum retry attempts after the first try.
    pub max_retries: u32,
    /// Base delay before the first retry.
    pub base_delay: Duration,
    /// Cap applied to the computed delay.
    pub max_delay: Duration,
}

impl RetryStrategy {
    /// Creates a strategy with the given retry count.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }

    /// Disables retries.
    pub fn no_retry() -> Self {
        Self::new(0)
    }

    /// Delay before retry number `attempt` (1-based), exponential.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        (self.base_delay * factor).min(self.max_delay)
    }

    /// Whether the given failure may be retried at all.
    pub fn should_retry(&self, error: &FetchError, attempt: u32) -> bool {
        if attempt > self.max_retries {
            return false;
        }
        match error.classify() {
            FailureKind::TransientNetwork => true,
            // Auth gets exactly one refresh-and-retry regardless of budget.
            FailureKind::AuthExpired => attempt == 1,
            _ => false,
        }
    }

    /// Whether a retry still fits in the deadline.
    pub fn fits_deadline(&self, attempt: u32, deadline: Deadline) -> bool {
        deadline.remaining() > self.delay_for_attempt(attempt)
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::new(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff() {
        let strategy = RetryStrategy::default();
        assert_eq!(strategy.delay_for_attempt(1), Duration::from_millis(500));
        assert_eq!(strategy.delay_for_attempt(2), Duration::from_millis(1000));
        assert_eq!(strategy.delay_for_attempt(3), Duration::from_millis(2000));
    }

    #[test]
    fn test_max_delay_cap() {
        let strategy = RetryStrategy::new(10);
        assert_eq!(strategy.delay_for_attempt(20), Duration::from_secs(10));
    }

    #[test]
    fn test_transient_retries_twice() {
        let strategy = RetryStrategy::default();
        let err = FetchError::Status { status: 503 };
        assert!(strategy.should_retry(&err, 1));
        assert!(strategy.should_retry(&err, 2));
        assert!(!strategy.should_retry(&err, 3));
    }

    #[test]
    fn test_rate_limited_never_retries() {
        let strategy = RetryStrategy::default();
        let err = FetchError::RateLimited { retry_after: None };
        assert!(!strategy.should_retry(&err, 1));
    }

    #[test]
    fn test_auth_retries_once() {
        let strategy = RetryStrategy::default();
        let err = FetchError::AuthExpired("token".to_string());
        assert!(strategy.should_retry(&err, 1));
        assert!(!strategy.should_retry(&err, 2));
    }

    #[test]
    fn test_bot_challenge_never_retries() {
        let strategy = RetryStrategy::default();
        let err = FetchError::BotChallenge("waf".to_string());
        assert!(!strategy.should_retry(&err, 1));
    }
}
