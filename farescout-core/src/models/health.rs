//! Failure taxonomy and per-source health views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::source::SourceId;

// ============================================================================
// Failure Kind
// ============================================================================

/// Taxonomic classification of an adapter failure.
///
/// Drives retry/backoff policy in the executor and health accounting.
/// These are categories, not error types; the fetch crate owns the
/// concrete errors and classifies them into this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// Timeout, connection reset, 5xx. Retried with backoff (max 2).
    TransientNetwork,
    /// 429 or empty token bucket. Waits up to the deadline; no retry.
    RateLimited,
    /// WAF block or CAPTCHA. Advances the evasion ladder; no sync retry.
    BotChallenge,
    /// 401 after a previously valid token. One refresh, one retry.
    AuthExpired,
    /// One offer malformed; siblings kept.
    ParseRecoverable,
    /// Root structure invalid; adapter fails and raises a structural alert.
    ParseUnusable,
    /// Valid response with zero offers. Not an error.
    UpstreamEmpty,
    /// Deadline or caller abort. Not counted against health.
    Cancelled,
}

impl FailureKind {
    /// Whether this failure counts against the source's health window.
    pub fn counts_against_health(&self) -> bool {
        !matches!(self, Self::Cancelled | Self::UpstreamEmpty)
    }

    /// Whether the executor may retry the same strategy synchronously.
    pub fn retryable(&self) -> bool {
        matches!(self, Self::TransientNetwork | Self::AuthExpired)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TransientNetwork => "TRANSIENT_NETWORK",
            Self::RateLimited => "RATE_LIMITED",
            Self::BotChallenge => "BOT_CHALLENGE",
            Self::AuthExpired => "AUTH_EXPIRED",
            Self::ParseRecoverable => "PARSE_ERROR(recoverable)",
            Self::ParseUnusable => "PARSE_ERROR(unusable)",
            Self::UpstreamEmpty => "UPSTREAM_EMPTY",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Circuit State
// ============================================================================

/// Circuit breaker state for one source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Normal operation.
    #[default]
    Closed,
    /// Short-circuited: calls are skipped until cooldown elapses.
    Open,
    /// One probe call allowed; success closes, failure reopens.
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Closed => "CLOSED",
            Self::Open => "OPEN",
            Self::HalfOpen => "HALF_OPEN",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Health Snapshot
// ============================================================================

/// Read-side view of one source's health.
///
/// Produced by the executor (the single writer) for the router. The
/// snapshot is a consistent copy; holding it never blocks the writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    /// The source this snapshot describes.
    pub source: SourceId,
    /// Success rate over the trailing window, 0.0-1.0. `None` before any
    /// completed call.
    pub success_rate: Option<f64>,
    /// p95 latency over the trailing window, milliseconds.
    pub p95_latency_ms: Option<u64>,
    /// Most recent classified failure.
    pub last_failure: Option<FailureKind>,
    /// Circuit breaker state at snapshot time.
    pub circuit: CircuitState,
    /// Approximate tokens remaining in the rate-limit bucket.
    pub bucket_remaining: f64,
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,
}

impl HealthSnapshot {
    /// A snapshot for a source that has not been called yet.
    pub fn untried(source: SourceId) -> Self {
        Self {
            source,
            success_rate: None,
            p95_latency_ms: None,
            last_failure: None,
            circuit: CircuitState::Closed,
            bucket_remaining: 0.0,
            taken_at: Utc::now(),
        }
    }

    /// Whether the trailing success rate is below the demotion threshold.
    pub fn is_degraded(&self) -> bool {
        self.success_rate.is_some_and(|r| r < 0.5)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_does_not_count() {
        assert!(!FailureKind::Cancelled.counts_against_health());
        assert!(!FailureKind::UpstreamEmpty.counts_against_health());
        assert!(FailureKind::BotChallenge.counts_against_health());
    }

    #[test]
    fn test_retry_policy() {
        assert!(FailureKind::TransientNetwork.retryable());
        assert!(FailureKind::AuthExpired.retryable());
        assert!(!FailureKind::RateLimited.retryable());
        assert!(!FailureKind::BotChallenge.retryable());
    }

    #[test]
    fn test_degraded_threshold() {
        let mut snap = HealthSnapshot::untried(SourceId::Google);
        assert!(!snap.is_degraded());
        snap.success_rate = Some(0.49);
        assert!(snap.is_degraded());
        snap.success_rate = Some(0.5);
        assert!(!snap.is_degraded());
    }
}
