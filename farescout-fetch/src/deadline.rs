//! Monotonic request deadlines.
//!
//! Every search request carries one [`Deadline`]; all downstream calls
//! receive the remaining budget rather than their own timeouts, so one
//! slow hop cannot silently extend the request.

use std::time::{Duration, Instant};

use crate::error::FetchError;

/// Monotonic deadline for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// Creates a deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
        }
    }

    /// Creates a deadline at an explicit instant.
    pub fn at(at: Instant) -> Self {
        Self { at }
    }

    /// Remaining budget, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// Whether the deadline has passed.
    pub fn expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Remaining budget, or `DeadlineExceeded` once expired.
    ///
    /// Adapters call this before every I/O step so cancellation is
    /// observed at each suspension point.
    pub fn checked_remaining(&self) -> Result<Duration, FetchError> {
        let rem = self.remaining();
        if rem.is_zero() {
            Err(FetchError::DeadlineExceeded)
        } else {
            Ok(rem)
        }
    }

    /// Whether at least `floor` of budget remains.
    ///
    /// Sources with an expensive setup (browser automation) are skipped
    /// entirely below their floor instead of being started and cancelled.
    pub fn has_at_least(&self, floor: Duration) -> bool {
        self.remaining() >= floor
    }

    /// The smaller of `wanted` and the remaining budget.
    pub fn clamp(&self, wanted: Duration) -> Duration {
        wanted.min(self.remaining())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_deadline_not_expired() {
        let d = Deadline::after(Duration::from_secs(5));
        assert!(!d.expired());
        assert!(d.has_at_least(Duration::from_secs(4)));
        assert!(!d.has_at_least(Duration::from_secs(6)));
    }

    #[test]
    fn test_expired_deadline() {
        let d = Deadline::at(Instant::now() - Duration::from_millis(1));
        assert!(d.expired());
        assert_eq!(d.remaining(), Duration::ZERO);
        assert!(d.checked_remaining().is_err());
    }

    #[test]
    fn test_clamp() {
        let d = Deadline::after(Duration::from_secs(2));
        assert!(d.clamp(Duration::from_secs(10)) <= Duration::from_secs(2));
        let clamped = d.clamp(Duration::from_millis(100));
        assert!(clamped <= Duration::from_millis(100));
    }
}
