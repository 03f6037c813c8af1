//! Per-source health: rolling outcomes, circuit breakers, evasion
//! ladders, and rate-limit buckets.
//!
//! The executor is the single writer; the router reads consistent
//! snapshots. Cancelled calls and empty-but-valid responses never count
//! against a source.

use chrono::Utc;
use farescout_core::{CircuitState, FailureKind, HealthSnapshot, SourceId};
use farescout_fetch::{BucketConfig, EvasionLadder, EvasionState, EvasionStrategy, TokenBucket};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Rolling window for success-rate and latency stats.
const STATS_WINDOW: Duration = Duration::from_secs(3600);

/// How many requests an evasion escalation persists before decaying.
const EVASION_HOLD_REQUESTS: u32 = 10;

// ============================================================================
// Circuit Config
// ============================================================================

/// Circuit breaker tuning, per source.
#[derive(Debug, Clone, Copy)]
pub struct CircuitConfig {
    /// Consecutive upstream failures that open the circuit.
    pub failure_threshold: u32,
    /// The failures must fall within this window.
    pub window: Duration,
    /// Cooldown before a half-open probe is allowed.
    pub cooldown: Duration,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            window: Duration::from_secs(60),
            cooldown: Duration::from_secs(30),
        }
    }
}

// ============================================================================
// Per-source State
// ============================================================================

#[derive(Debug)]
struct Outcome {
    at: Instant,
    success: bool,
    latency_ms: u64,
}

struct SourceState {
    outcomes: VecDeque<Outcome>,
    consecutive_failures: u32,
    first_failure_at: Option<Instant>,
    last_failure: Option<FailureKind>,
    circuit: CircuitState,
    opened_at: Option<Instant>,
    structural_alert: bool,
    evasion: EvasionState,
    bucket: TokenBucket,
    circuit_config: CircuitConfig,
}

impl SourceState {
    fn new(ladder: EvasionLadder, bucket: BucketConfig, circuit: CircuitConfig) -> Self {
        Self {
            outcomes: VecDeque::new(),
            consecutive_failures: 0,
            first_failure_at: None,
            last_failure: None,
            circuit: CircuitState::Closed,
            opened_at: None,
            structural_alert: false,
            evasion: EvasionState::new(ladder, EVASION_HOLD_REQUESTS),
            bucket: TokenBucket::new(bucket),
            circuit_config: circuit,
        }
    }

    fn trim(&mut self) {
        let cutoff = Instant::now() - STATS_WINDOW;
        while self.outcomes.front().is_some_and(|o| o.at < cutoff) {
            self.outcomes.pop_front();
        }
    }

    fn success_rate(&self) -> Option<f64> {
        if self.outcomes.is_empty() {
            return None;
        }
        let successes = self.outcomes.iter().filter(|o| o.success).count();
        #[allow(clippy::cast_precision_loss)]
        let rate = successes as f64 / self.outcomes.len() as f64;
        Some(rate)
    }

    fn p95_latency_ms(&self) -> Option<u64> {
        if self.outcomes.is_empty() {
            return None;
        }
        let mut latencies: Vec<u64> = self.outcomes.iter().map(|o| o.latency_ms).collect();
        latencies.sort_unstable();
        let idx = (latencies.len().saturating_sub(1)) * 95 / 100;
        latencies.get(idx).copied()
    }
}

// ============================================================================
// Health Registry
// ============================================================================

/// Registry over all sources' mutable health state.
pub struct HealthRegistry {
    sources: HashMap<SourceId, Mutex<SourceState>>,
}

impl HealthRegistry {
    /// Builds the registry from per-source ladders, buckets, and circuit
    /// tuning.
    pub fn new(
        sources: impl IntoIterator<Item = (SourceId, EvasionLadder, BucketConfig)>,
        circuit: CircuitConfig,
    ) -> Self {
        let sources = sources
            .into_iter()
            .map(|(id, ladder, bucket)| {
                (id, Mutex::new(SourceState::new(ladder, bucket, circuit)))
            })
            .collect();
        Self { sources }
    }

    fn with_state<R>(&self, source: SourceId, f: impl FnOnce(&mut SourceState) -> R) -> Option<R> {
        let state = self.sources.get(&source)?;
        let mut guard = state.lock().expect("health lock poisoned");
        Some(f(&mut guard))
    }

    /// The rate-limit bucket for a source.
    pub fn bucket(&self, source: SourceId) -> Option<TokenBucket> {
        self.with_state(source, |s| s.bucket.clone())
    }

    /// The evasion rung a source should use for its next request.
    pub fn evasion_strategy(&self, source: SourceId) -> EvasionStrategy {
        self.with_state(source, |s| s.evasion.current())
            .unwrap_or(EvasionStrategy::Direct)
    }

    /// Current rung index, for observability.
    pub fn evasion_index(&self, source: SourceId) -> usize {
        self.with_state(source, |s| s.evasion.index()).unwrap_or(0)
    }

    /// Whether a call to this source may proceed.
    ///
    /// OPEN circuits past their cooldown flip to HALF_OPEN and admit a
    /// single probe call.
    pub fn admit(&self, source: SourceId) -> bool {
        self.with_state(source, |s| match s.circuit {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let cooled = s
                    .opened_at
                    .is_some_and(|at| at.elapsed() >= s.circuit_config.cooldown);
                if cooled {
                    info!(source = %source, "Circuit half-open, admitting probe");
                    s.circuit = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        })
        .unwrap_or(false)
    }

    /// Records a successful call.
    pub fn record_success(&self, source: SourceId, latency: Duration) {
        self.with_state(source, |s| {
            s.trim();
            s.outcomes.push_back(Outcome {
                at: Instant::now(),
                success: true,
                latency_ms: u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
            });
            s.consecutive_failures = 0;
            s.first_failure_at = None;
            s.structural_alert = false;
            s.evasion.tick();
            if s.circuit != CircuitState::Closed {
                info!(source = %source, "Circuit closed after successful call");
                s.circuit = CircuitState::Closed;
                s.opened_at = None;
            }
        });
    }

    /// Records a failed call with its classification.
    ///
    /// Cancellations and empty results do not count. A bot challenge
    /// advances the evasion ladder; an unusable parse raises the
    /// structural alert that demotes the source.
    pub fn record_failure(&self, source: SourceId, kind: FailureKind, latency: Duration) {
        self.with_state(source, |s| {
            s.last_failure = Some(kind);
            if !kind.counts_against_health() {
                return;
            }
            s.trim();
            s.outcomes.push_back(Outcome {
                at: Instant::now(),
                success: false,
                latency_ms: u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
            });

            if kind == FailureKind::BotChallenge {
                s.evasion.advance();
                info!(
                    source = %source,
                    rung = s.evasion.index(),
                    "Evasion ladder advanced after bot challenge"
                );
            }
            if kind == FailureKind::ParseUnusable {
                // Structural-change alert: the source changed shape.
                warn!(
                    source = %source,
                    alert = "structural_change",
                    "Response structure no longer parses; demoting source"
                );
                s.structural_alert = true;
            }

            let now = Instant::now();
            if s.consecutive_failures == 0 {
                s.first_failure_at = Some(now);
            }
            s.consecutive_failures += 1;

            let within_window = s
                .first_failure_at
                .is_some_and(|at| now.duration_since(at) <= s.circuit_config.window);
            if !within_window {
                // Window rolled over; this failure starts a new streak.
                s.consecutive_failures = 1;
                s.first_failure_at = Some(now);
                return;
            }

            match s.circuit {
                CircuitState::HalfOpen => {
                    warn!(source = %source, "Probe failed, circuit re-opened");
                    s.circuit = CircuitState::Open;
                    s.opened_at = Some(now);
                }
                CircuitState::Closed
                    if s.consecutive_failures >= s.circuit_config.failure_threshold =>
                {
                    warn!(
                        source = %source,
                        failures = s.consecutive_failures,
                        "Circuit opened"
                    );
                    s.circuit = CircuitState::Open;
                    s.opened_at = Some(now);
                }
                _ => {}
            }
        });
    }

    /// Whether the source carries an unresolved structural alert.
    pub fn has_structural_alert(&self, source: SourceId) -> bool {
        self.with_state(source, |s| s.structural_alert).unwrap_or(false)
    }

    /// Consistent snapshot of one source.
    pub fn snapshot(&self, source: SourceId) -> HealthSnapshot {
        self.with_state(source, |s| {
            s.trim();
            HealthSnapshot {
                source,
                success_rate: s.success_rate(),
                p95_latency_ms: s.p95_latency_ms(),
                last_failure: s.last_failure,
                circuit: s.circuit,
                bucket_remaining: s.bucket.remaining(),
                taken_at: Utc::now(),
            }
        })
        .unwrap_or_else(|| HealthSnapshot::untried(source))
    }

    /// Snapshots of every registered source.
    pub fn snapshots(&self) -> Vec<HealthSnapshot> {
        let mut ids: Vec<SourceId> = self.sources.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter().map(|id| self.snapshot(id)).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(circuit: CircuitConfig) -> HealthRegistry {
        HealthRegistry::new(
            [(
                SourceId::Google,
                EvasionLadder::new(vec![
                    EvasionStrategy::Direct,
                    EvasionStrategy::BrowserSession,
                ]),
                BucketConfig::default(),
            )],
            circuit,
        )
    }

    #[test]
    fn test_circuit_opens_after_threshold() {
        let registry = registry(CircuitConfig {
            failure_threshold: 3,
            window: Duration::from_secs(60),
            cooldown: Duration::from_secs(30),
        });

        for _ in 0..2 {
            registry.record_failure(
                SourceId::Google,
                FailureKind::TransientNetwork,
                Duration::from_millis(100),
            );
            assert!(registry.admit(SourceId::Google));
        }
        registry.record_failure(
            SourceId::Google,
            FailureKind::TransientNetwork,
            Duration::from_millis(100),
        );
        assert_eq!(
            registry.snapshot(SourceId::Google).circuit,
            CircuitState::Open
        );
        assert!(!registry.admit(SourceId::Google));
    }

    #[test]
    fn test_cancellation_never_opens_circuit() {
        let registry = registry(CircuitConfig {
            failure_threshold: 1,
            ..CircuitConfig::default()
        });
        for _ in 0..5 {
            registry.record_failure(
                SourceId::Google,
                FailureKind::Cancelled,
                Duration::from_millis(10),
            );
        }
        assert_eq!(
            registry.snapshot(SourceId::Google).circuit,
            CircuitState::Closed
        );
        assert_eq!(registry.snapshot(SourceId::Google).success_rate, None);
    }

    #[test]
    fn test_half_open_after_cooldown_then_close() {
        let registry = registry(CircuitConfig {
            failure_threshold: 1,
            window: Duration::from_secs(60),
            cooldown: Duration::from_millis(10),
        });
        registry.record_failure(
            SourceId::Google,
            FailureKind::TransientNetwork,
            Duration::from_millis(100),
        );
        assert!(!registry.admit(SourceId::Google));

        std::thread::sleep(Duration::from_millis(15));
        assert!(registry.admit(SourceId::Google), "probe after cooldown");
        assert_eq!(
            registry.snapshot(SourceId::Google).circuit,
            CircuitState::HalfOpen
        );

        registry.record_success(SourceId::Google, Duration::from_millis(50));
        assert_eq!(
            registry.snapshot(SourceId::Google).circuit,
            CircuitState::Closed
        );
    }

    #[test]
    fn test_half_open_probe_failure_reopens() {
        let registry = registry(CircuitConfig {
            failure_threshold: 1,
            window: Duration::from_secs(60),
            cooldown: Duration::from_millis(10),
        });
        registry.record_failure(
            SourceId::Google,
            FailureKind::TransientNetwork,
            Duration::from_millis(100),
        );
        std::thread::sleep(Duration::from_millis(15));
        assert!(registry.admit(SourceId::Google));

        registry.record_failure(
            SourceId::Google,
            FailureKind::TransientNetwork,
            Duration::from_millis(100),
        );
        assert_eq!(
            registry.snapshot(SourceId::Google).circuit,
            CircuitState::Open
        );
    }

    #[test]
    fn test_bot_challenge_advances_evasion() {
        let registry = registry(CircuitConfig::default());
        assert_eq!(registry.evasion_index(SourceId::Google), 0);
        registry.record_failure(
            SourceId::Google,
            FailureKind::BotChallenge,
            Duration::from_millis(100),
        );
        assert_eq!(registry.evasion_index(SourceId::Google), 1);
        assert_eq!(
            registry.evasion_strategy(SourceId::Google),
            EvasionStrategy::BrowserSession
        );
    }

    #[test]
    fn test_structural_alert_set_and_cleared() {
        let registry = registry(CircuitConfig::default());
        registry.record_failure(
            SourceId::Google,
            FailureKind::ParseUnusable,
            Duration::from_millis(100),
        );
        assert!(registry.has_structural_alert(SourceId::Google));

        registry.record_success(SourceId::Google, Duration::from_millis(50));
        assert!(!registry.has_structural_alert(SourceId::Google));
    }

    #[test]
    fn test_success_rate_and_latency() {
        let registry = registry(CircuitConfig::default());
        registry.record_success(SourceId::Google, Duration::from_millis(100));
        registry.record_success(SourceId::Google, Duration::from_millis(200));
        registry.record_failure(
            SourceId::Google,
            FailureKind::TransientNetwork,
            Duration::from_millis(300),
        );

        let snap = registry.snapshot(SourceId::Google);
        let rate = snap.success_rate.unwrap();
        assert!((rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(snap.p95_latency_ms, Some(300));
    }

    #[test]
    fn test_unknown_source_snapshot() {
        let registry = registry(CircuitConfig::default());
        let snap = registry.snapshot(SourceId::Kiwi);
        assert_eq!(snap.success_rate, None);
        assert_eq!(snap.circuit, CircuitState::Closed);
    }
}
