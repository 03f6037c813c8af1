//! Fan-out execution.
//!
//! Launches every planned source concurrently under the request
//! deadline, streams per-source events over a bounded channel, and
//! collects with first-response-wins semantics for interactive queries:
//! return once any source produced offers and the grace window elapsed,
//! while stragglers keep running and feed a background continuation.
//!
//! Failures are isolated per source and recorded in the health registry;
//! nothing here bubbles an individual adapter error to the caller.

use farescout_adapters::{Adapter, Normalizer};
use farescout_core::{FailureKind, Offer, Query, QueryMode, SourceId, SourceTier};
use farescout_fetch::{AdapterContext, Deadline, FetchError, RetryStrategy};
use farescout_store::config::ExecutorSettings;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::EngineError;
use crate::health::HealthRegistry;
use crate::merger;
use crate::router::RoutePlan;

// ============================================================================
// Config
// ============================================================================

/// Executor timing configuration.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Hard deadline for interactive queries.
    pub interactive_deadline: Duration,
    /// Deadline for background refreshes.
    pub background_deadline: Duration,
    /// Grace window after the first result before returning.
    pub first_response_grace: Duration,
    /// Sub-deadline before the fallback tier launches.
    pub fallback_sub_deadline: Duration,
    /// Retry/backoff policy.
    pub retry: RetryStrategy,
}

impl ExecutorConfig {
    /// Builds the config from stored settings.
    pub fn from_settings(settings: &ExecutorSettings) -> Self {
        Self {
            interactive_deadline: Duration::from_millis(settings.interactive_deadline_ms),
            background_deadline: Duration::from_millis(settings.background_deadline_ms),
            first_response_grace: Duration::from_millis(settings.first_response_grace_ms),
            fallback_sub_deadline: Duration::from_millis(settings.fallback_sub_deadline_ms),
            retry: RetryStrategy::default(),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::from_settings(&ExecutorSettings::default())
    }
}

// ============================================================================
// Outcome Types
// ============================================================================

/// Final result of one fan-out (or its background continuation).
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    /// Merged offers, sorted by lowest price.
    pub offers: Vec<Offer>,
    /// Price count per source.
    pub source_mix: BTreeMap<SourceId, usize>,
    /// Terminal failures per source.
    pub errors: Vec<(SourceId, FailureKind)>,
}

/// Outcome of one fan-out call.
#[derive(Debug)]
pub struct FanOutOutcome {
    /// What was collected by return time.
    pub summary: CrawlSummary,
    /// True when sources were still running at return time.
    pub partial: bool,
    /// Joins the stragglers' final summary; present iff `partial`.
    pub completion: Option<JoinHandle<CrawlSummary>>,
}

#[derive(Debug)]
enum TaskEvent {
    Offers(Vec<Offer>),
    Failed(FailureKind),
    Done,
}

// ============================================================================
// Executor
// ============================================================================

/// Parallel fan-out executor. Owns the adapter instances, the shared
/// context, and the health registry (single writer).
pub struct FanOutExecutor {
    adapters: HashMap<SourceId, Arc<dyn Adapter>>,
    ctx: Arc<AdapterContext>,
    health: Arc<HealthRegistry>,
    normalizer: Arc<Normalizer>,
    config: ExecutorConfig,
    timeouts: HashMap<SourceId, Duration>,
}

impl FanOutExecutor {
    /// Creates the executor.
    pub fn new(
        adapters: HashMap<SourceId, Arc<dyn Adapter>>,
        ctx: Arc<AdapterContext>,
        health: Arc<HealthRegistry>,
        normalizer: Arc<Normalizer>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            adapters,
            ctx,
            health,
            normalizer,
            config,
            timeouts: HashMap::new(),
        }
    }

    /// Sets per-source call timeouts; each source's deadline is the
    /// smaller of its timeout and the request's remaining budget.
    pub fn with_timeouts(mut self, timeouts: HashMap<SourceId, Duration>) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// The health registry (read access for routing and reporting).
    pub fn health(&self) -> &Arc<HealthRegistry> {
        &self.health
    }

    /// Probes one source's reachability, feeding the circuit breaker.
    ///
    /// Used for open-circuit re-probes scheduled by the router.
    pub async fn probe(&self, source: SourceId) -> bool {
        let Some(adapter) = self.adapters.get(&source) else {
            return false;
        };
        if !self.health.admit(source) {
            return false;
        }
        let started = std::time::Instant::now();
        let healthy = adapter.health_check(&self.ctx).await;
        if healthy {
            self.health.record_success(source, started.elapsed());
        } else {
            self.health.record_failure(
                source,
                FailureKind::TransientNetwork,
                started.elapsed(),
            );
        }
        healthy
    }

    fn launch(
        &self,
        source: SourceId,
        query: &Query,
        deadline: Deadline,
        cancel: &CancellationToken,
        tx: &mpsc::Sender<(SourceId, TaskEvent)>,
    ) -> bool {
        let Some(adapter) = self.adapters.get(&source) else {
            warn!(source = %source, "No adapter built for planned source");
            return false;
        };
        if !deadline.has_at_least(adapter.deadline_floor()) {
            debug!(source = %source, "Skipped: below deadline floor");
            return false;
        }
        if !self.health.admit(source) {
            debug!(source = %source, "Skipped: circuit open");
            return false;
        }

        let source_deadline = match self.timeouts.get(&source) {
            Some(timeout) => Deadline::after(deadline.clamp(*timeout)),
            None => deadline,
        };
        let task = SourceTask {
            source,
            adapter: Arc::clone(adapter),
            ctx: Arc::clone(&self.ctx),
            health: Arc::clone(&self.health),
            normalizer: Arc::clone(&self.normalizer),
            query: query.clone(),
            deadline: source_deadline,
            cancel: cancel.clone(),
            retry: self.config.retry.clone(),
            tx: tx.clone(),
        };
        tokio::spawn(task.run());
        true
    }

    /// Runs one fan-out for the given plan.
    #[instrument(skip(self, query, plan), fields(origin = %query.origin, destination = %query.destination, mode = ?mode))]
    pub async fn run(
        &self,
        query: &Query,
        plan: &RoutePlan,
        mode: QueryMode,
    ) -> Result<FanOutOutcome, EngineError> {
        let budget = match mode {
            QueryMode::Interactive => self.config.interactive_deadline,
            QueryMode::Background => self.config.background_deadline,
        };
        let deadline = Deadline::after(budget);
        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel::<(SourceId, TaskEvent)>(64);

        // Hard-deadline watchdog: guarantees cancellation propagation no
        // matter how the collector exits.
        {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(budget).await;
                cancel.cancel();
            });
        }

        let mut launched = 0usize;
        for (source, tier) in &plan.entries {
            if *tier == SourceTier::Fallback {
                continue;
            }
            if self.launch(*source, query, deadline, &cancel, &tx) {
                launched += 1;
            }
        }

        let fallback_sources: Vec<SourceId> = plan.tier(SourceTier::Fallback).collect();
        let mut fallback_launched = fallback_sources.is_empty();

        if launched == 0 {
            // Everything skipped up front; go straight to fallback.
            for source in &fallback_sources {
                if self.launch(*source, query, deadline, &cancel, &tx) {
                    launched += 1;
                }
            }
            fallback_launched = true;
            if launched == 0 {
                return Err(EngineError::AllSourcesFailed);
            }
        }

        let started = Instant::now();
        let sub_deadline = started + self.config.fallback_sub_deadline;
        let mut offers: Vec<Offer> = Vec::new();
        let mut errors: Vec<(SourceId, FailureKind)> = Vec::new();
        let mut done = 0usize;
        let mut grace_until: Option<Instant> = None;
        let mut timed_out = false;

        loop {
            // Timer futures capture copies so the recv arm may mutate
            // the collector state they were derived from.
            let grace_at = grace_until;
            let grace = async move {
                match grace_at {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };
            let fallback_pending = fallback_launched;
            let fallback_timer = async move {
                if fallback_pending {
                    std::future::pending::<()>().await;
                } else {
                    tokio::time::sleep_until(sub_deadline).await;
                }
            };

            tokio::select! {
                event = rx.recv() => {
                    let Some((source, event)) = event else { break };
                    match event {
                        TaskEvent::Offers(mut batch) => {
                            debug!(source = %source, count = batch.len(), "Offers received");
                            offers.append(&mut batch);
                            if mode == QueryMode::Interactive
                                && grace_until.is_none()
                                && !offers.is_empty()
                            {
                                grace_until =
                                    Some(Instant::now() + self.config.first_response_grace);
                            }
                        }
                        TaskEvent::Failed(kind) => {
                            errors.push((source, kind));
                        }
                        TaskEvent::Done => {
                            done += 1;
                            if done == launched {
                                if offers.is_empty() && !fallback_launched {
                                    for source in &fallback_sources {
                                        if self.launch(*source, query, deadline, &cancel, &tx) {
                                            launched += 1;
                                        }
                                    }
                                    fallback_launched = true;
                                    if done == launched {
                                        break;
                                    }
                                } else {
                                    break;
                                }
                            }
                        }
                    }
                }
                () = grace => {
                    debug!("First-response grace window elapsed");
                    break;
                }
                () = fallback_timer => {
                    if offers.is_empty() {
                        debug!("Sub-deadline reached with no offers, launching fallback tier");
                        for source in &fallback_sources {
                            if self.launch(*source, query, deadline, &cancel, &tx) {
                                launched += 1;
                            }
                        }
                    }
                    fallback_launched = true;
                }
                () = cancel.cancelled() => {
                    timed_out = true;
                    break;
                }
            }
        }

        let partial = done < launched;
        let merged = merger::merge(offers.clone());
        let mix = merger::source_mix(&merged);

        if merged.is_empty() {
            let cancelled = errors
                .iter()
                .filter(|(_, kind)| *kind == FailureKind::Cancelled)
                .count();
            let terminal = errors.len() - cancelled;
            if !partial && launched > 0 && terminal == launched {
                return Err(EngineError::AllSourcesFailed);
            }
            // Cancellations only come from the deadline watchdog.
            if timed_out || cancelled > 0 {
                return Err(EngineError::Timeout);
            }
        }

        let completion = if partial {
            let pending = launched - done;
            info!(pending, "Returning early; background continuation running");
            let grace_cancel = cancel.clone();
            let continuation_errors = errors.clone();
            Some(tokio::spawn(async move {
                let mut offers = offers;
                let mut errors = continuation_errors;
                let mut done = done;
                loop {
                    tokio::select! {
                        event = rx.recv() => {
                            let Some((source, event)) = event else { break };
                            match event {
                                TaskEvent::Offers(mut batch) => offers.append(&mut batch),
                                TaskEvent::Failed(kind) => errors.push((source, kind)),
                                TaskEvent::Done => {
                                    done += 1;
                                    if done == launched {
                                        break;
                                    }
                                }
                            }
                        }
                        () = grace_cancel.cancelled() => break,
                    }
                }
                let merged = merger::merge(offers);
                let source_mix = merger::source_mix(&merged);
                CrawlSummary {
                    offers: merged,
                    source_mix,
                    errors,
                }
            }))
        } else {
            cancel.cancel();
            None
        };

        Ok(FanOutOutcome {
            summary: CrawlSummary {
                offers: merged,
                source_mix: mix,
                errors,
            },
            partial,
            completion,
        })
    }
}

// ============================================================================
// Per-source task
// ============================================================================

struct SourceTask {
    source: SourceId,
    adapter: Arc<dyn Adapter>,
    ctx: Arc<AdapterContext>,
    health: Arc<HealthRegistry>,
    normalizer: Arc<Normalizer>,
    query: Query,
    deadline: Deadline,
    cancel: CancellationToken,
    retry: RetryStrategy,
    tx: mpsc::Sender<(SourceId, TaskEvent)>,
}

impl SourceTask {
    async fn run(self) {
        let event = match self.drive().await {
            Ok(offers) => TaskEvent::Offers(offers),
            Err(kind) => TaskEvent::Failed(kind),
        };
        let _ = self.tx.send((self.source, event)).await;
        let _ = self.tx.send((self.source, TaskEvent::Done)).await;
    }

    /// Runs the adapter with retry policy; every await is a cancellation
    /// point. Returns offers or the terminal failure kind.
    async fn drive(&self) -> Result<Vec<Offer>, FailureKind> {
        let Some(bucket) = self.health.bucket(self.source) else {
            return Err(FailureKind::TransientNetwork);
        };

        let mut attempt = 1u32;
        loop {
            if self.cancel.is_cancelled() || self.deadline.expired() {
                return Err(FailureKind::Cancelled);
            }

            // Token consumed before the network call; the acquire wait
            // is bounded by the deadline and abandoned on cancellation
            // (the permit refunds itself).
            let permit = tokio::select! {
                permit = bucket.acquire(self.deadline) => {
                    match permit {
                        Ok(p) => p,
                        Err(e) => {
                            let kind = e.classify();
                            self.health.record_failure(self.source, kind, Duration::ZERO);
                            return Err(kind);
                        }
                    }
                }
                () = self.cancel.cancelled() => return Err(FailureKind::Cancelled),
            };

            let evasion = self.health.evasion_strategy(self.source);
            permit.commit();

            let started = std::time::Instant::now();
            let result = tokio::select! {
                result = self
                    .adapter
                    .search(&self.query, &self.ctx, self.deadline, evasion) => result,
                () = self.cancel.cancelled() => Err(FetchError::Cancelled),
            };
            let latency = started.elapsed();

            match result {
                Ok(raws) => {
                    return match self.normalizer.normalize_batch(&raws, &self.query) {
                        Ok((offers, skipped)) => {
                            if skipped > 0 {
                                debug!(
                                    source = %self.source,
                                    skipped,
                                    "Recoverable parse errors in batch"
                                );
                            }
                            self.health.record_success(self.source, latency);
                            Ok(offers)
                        }
                        Err(_unusable) => {
                            self.health.record_failure(
                                self.source,
                                FailureKind::ParseUnusable,
                                latency,
                            );
                            Err(FailureKind::ParseUnusable)
                        }
                    };
                }
                Err(error) => {
                    let kind = self.adapter.classify_failure(&error);
                    self.health.record_failure(self.source, kind, latency);

                    let may_retry = self.retry.should_retry(&error, attempt)
                        && self.retry.fits_deadline(attempt, self.deadline)
                        && !self.cancel.is_cancelled();
                    if may_retry {
                        debug!(
                            source = %self.source,
                            attempt,
                            kind = %kind,
                            "Retrying after backoff"
                        );
                        tokio::select! {
                            () = tokio::time::sleep(self.retry.delay_for_attempt(attempt)) => {}
                            () = self.cancel.cancelled() => return Err(FailureKind::Cancelled),
                        }
                        attempt += 1;
                        continue;
                    }
                    return Err(kind);
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::CircuitConfig;
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone, Utc};
    use farescout_adapters::kiwi::parser::{KiwiItinerary, KiwiSegment};
    use farescout_adapters::google::parser::{GoogleItinerary, GoogleSegment};
    use farescout_adapters::raw::{RawOffer, RawPayload};
    use farescout_fetch::{BucketConfig, EvasionLadder, EvasionStrategy};

    #[derive(Clone)]
    enum Behavior {
        Offers(Vec<RawOffer>),
        Empty,
        Transient,
        BotChallenge,
        Hang,
    }

    struct MockAdapter {
        id: SourceId,
        delay: Duration,
        behavior: Behavior,
    }

    #[async_trait]
    impl Adapter for MockAdapter {
        fn id(&self) -> SourceId {
            self.id
        }

        fn deadline_floor(&self) -> Duration {
            Duration::ZERO
        }

        async fn search(
            &self,
            _query: &Query,
            _ctx: &AdapterContext,
            _deadline: Deadline,
            _evasion: EvasionStrategy,
        ) -> Result<Vec<RawOffer>, FetchError> {
            tokio::time::sleep(self.delay).await;
            match &self.behavior {
                Behavior::Offers(raws) => Ok(raws.clone()),
                Behavior::Empty => Ok(Vec::new()),
                Behavior::Transient => Err(FetchError::Status { status: 503 }),
                Behavior::BotChallenge => {
                    Err(FetchError::BotChallenge("blocked".to_string()))
                }
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Vec::new())
                }
            }
        }

        async fn health_check(&self, _ctx: &AdapterContext) -> bool {
            true
        }
    }

    fn query() -> Query {
        Query::one_way("ICN", "NRT", NaiveDate::from_ymd_opt(2026, 4, 15).unwrap())
    }

    fn kiwi_raw(amount: f64) -> RawOffer {
        RawOffer::new(
            SourceId::Kiwi,
            RawPayload::Kiwi(KiwiItinerary {
                price: amount,
                currency: "KRW".to_string(),
                booking_url: Some("https://kiwi.example/book".to_string()),
                includes_baggage: false,
                segments: vec![KiwiSegment {
                    carrier: "KE".to_string(),
                    operating_carrier: Some("KE".to_string()),
                    flight_no: 901,
                    origin: "ICN".to_string(),
                    destination: "NRT".to_string(),
                    depart_utc: Utc.with_ymd_and_hms(2026, 4, 15, 1, 30, 0).unwrap(),
                    arrive_utc: Utc.with_ymd_and_hms(2026, 4, 15, 4, 0, 0).unwrap(),
                    fare_category: None,
                }],
            }),
        )
    }

    fn google_raw(amount: f64) -> RawOffer {
        let date = NaiveDate::from_ymd_opt(2026, 4, 15).unwrap();
        RawOffer::new(
            SourceId::Google,
            RawPayload::Google(GoogleItinerary {
                segments: vec![GoogleSegment {
                    carrier: "KE".to_string(),
                    carrier_name: "Korean Air".to_string(),
                    flight_number: "901".to_string(),
                    operator: None,
                    origin: "ICN".to_string(),
                    destination: "NRT".to_string(),
                    depart_local: date.and_hms_opt(10, 30, 0).unwrap(),
                    arrive_local: date.and_hms_opt(13, 0, 0).unwrap(),
                    duration_min: 150,
                    aircraft: None,
                }],
                price: amount,
                currency: "KRW".to_string(),
            }),
        )
    }

    fn executor_with(
        mocks: Vec<MockAdapter>,
        config: ExecutorConfig,
    ) -> (FanOutExecutor, RoutePlan) {
        let mut adapters: HashMap<SourceId, Arc<dyn Adapter>> = HashMap::new();
        let mut health_sources = Vec::new();
        let mut entries = Vec::new();
        for mock in mocks {
            let id = mock.id;
            health_sources.push((
                id,
                EvasionLadder::single(EvasionStrategy::Direct),
                BucketConfig::new(10.0, 10.0),
            ));
            adapters.insert(id, Arc::new(mock) as Arc<dyn Adapter>);
            entries.push((id, SourceTier::Primary));
        }
        let health = Arc::new(HealthRegistry::new(health_sources, CircuitConfig::default()));
        let executor = FanOutExecutor::new(
            adapters,
            Arc::new(AdapterContext::minimal()),
            health,
            Arc::new(Normalizer::builtin()),
            config,
        );
        (executor, RoutePlan {
            entries,
            probes: Vec::new(),
        })
    }

    fn fast_config() -> ExecutorConfig {
        ExecutorConfig {
            interactive_deadline: Duration::from_millis(800),
            background_deadline: Duration::from_secs(5),
            first_response_grace: Duration::from_millis(50),
            fallback_sub_deadline: Duration::from_millis(100),
            retry: RetryStrategy::no_retry(),
        }
    }

    #[tokio::test]
    async fn test_cold_route_merges_both_sources() {
        let (executor, plan) = executor_with(
            vec![
                MockAdapter {
                    id: SourceId::Google,
                    delay: Duration::from_millis(10),
                    behavior: Behavior::Offers(vec![google_raw(420_000.0)]),
                },
                MockAdapter {
                    id: SourceId::Kiwi,
                    delay: Duration::from_millis(10),
                    behavior: Behavior::Offers(vec![kiwi_raw(415_000.0)]),
                },
            ],
            fast_config(),
        );

        let outcome = executor
            .run(&query(), &plan, QueryMode::Background)
            .await
            .unwrap();
        assert!(!outcome.partial);

        // Same flight from both sources collapses to one offer.
        assert_eq!(outcome.summary.offers.len(), 1);
        let offer = &outcome.summary.offers[0];
        assert_eq!(offer.prices.len(), 2);
        assert_eq!(offer.lowest_price(), 415_000.0);
        assert_eq!(offer.booking_urls().count(), 1);
        assert_eq!(outcome.summary.source_mix.len(), 2);
    }

    #[tokio::test]
    async fn test_first_response_wins_with_continuation() {
        let (executor, plan) = executor_with(
            vec![
                MockAdapter {
                    id: SourceId::Kiwi,
                    delay: Duration::from_millis(10),
                    behavior: Behavior::Offers(vec![kiwi_raw(415_000.0)]),
                },
                MockAdapter {
                    id: SourceId::Google,
                    delay: Duration::from_millis(300),
                    behavior: Behavior::Offers(vec![google_raw(420_000.0)]),
                },
            ],
            fast_config(),
        );

        let started = std::time::Instant::now();
        let outcome = executor
            .run(&query(), &plan, QueryMode::Interactive)
            .await
            .unwrap();

        // Returned after the grace window, well before the slow source.
        assert!(started.elapsed() < Duration::from_millis(250));
        assert!(outcome.partial);
        assert_eq!(outcome.summary.offers.len(), 1);
        assert_eq!(
            outcome.summary.source_mix.keys().copied().collect::<Vec<_>>(),
            vec![SourceId::Kiwi]
        );

        // The straggler lands in the background continuation.
        let final_summary = outcome.completion.unwrap().await.unwrap();
        assert_eq!(final_summary.offers.len(), 1);
        assert_eq!(final_summary.offers[0].prices.len(), 2);
        assert_eq!(final_summary.source_mix.len(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let (executor, plan) = executor_with(
            vec![
                MockAdapter {
                    id: SourceId::Kiwi,
                    delay: Duration::from_millis(10),
                    behavior: Behavior::Offers(vec![kiwi_raw(415_000.0)]),
                },
                MockAdapter {
                    id: SourceId::Google,
                    delay: Duration::from_millis(10),
                    behavior: Behavior::Transient,
                },
            ],
            fast_config(),
        );

        let outcome = executor
            .run(&query(), &plan, QueryMode::Background)
            .await
            .unwrap();
        assert_eq!(outcome.summary.offers.len(), 1);
        assert!(outcome
            .summary
            .errors
            .iter()
            .any(|(id, kind)| *id == SourceId::Google
                && *kind == FailureKind::TransientNetwork));
    }

    #[tokio::test]
    async fn test_all_sources_failed() {
        let (executor, plan) = executor_with(
            vec![
                MockAdapter {
                    id: SourceId::Kiwi,
                    delay: Duration::from_millis(10),
                    behavior: Behavior::Transient,
                },
                MockAdapter {
                    id: SourceId::Google,
                    delay: Duration::from_millis(10),
                    behavior: Behavior::Transient,
                },
            ],
            fast_config(),
        );

        let err = executor
            .run(&query(), &plan, QueryMode::Background)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AllSourcesFailed));
    }

    #[tokio::test]
    async fn test_deadline_exhaustion_times_out() {
        let (executor, plan) = executor_with(
            vec![
                MockAdapter {
                    id: SourceId::Kiwi,
                    delay: Duration::ZERO,
                    behavior: Behavior::Hang,
                },
                MockAdapter {
                    id: SourceId::Google,
                    delay: Duration::ZERO,
                    behavior: Behavior::Hang,
                },
            ],
            ExecutorConfig {
                interactive_deadline: Duration::from_millis(120),
                ..fast_config()
            },
        );

        let err = executor
            .run(&query(), &plan, QueryMode::Interactive)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Timeout));
    }

    #[tokio::test]
    async fn test_fallback_launches_when_primaries_empty() {
        let (executor, mut plan) = executor_with(
            vec![
                MockAdapter {
                    id: SourceId::Google,
                    delay: Duration::from_millis(10),
                    behavior: Behavior::Empty,
                },
                MockAdapter {
                    id: SourceId::Kiwi,
                    delay: Duration::from_millis(10),
                    behavior: Behavior::Offers(vec![kiwi_raw(415_000.0)]),
                },
            ],
            fast_config(),
        );
        // Demote the productive source to fallback.
        plan.entries = vec![
            (SourceId::Google, SourceTier::Primary),
            (SourceId::Kiwi, SourceTier::Fallback),
        ];

        let outcome = executor
            .run(&query(), &plan, QueryMode::Background)
            .await
            .unwrap();
        assert_eq!(outcome.summary.offers.len(), 1);
        assert_eq!(outcome.summary.offers[0].prices[0].source, SourceId::Kiwi);
    }

    #[tokio::test]
    async fn test_open_circuit_source_not_launched() {
        let (executor, plan) = executor_with(
            vec![MockAdapter {
                id: SourceId::Kiwi,
                delay: Duration::from_millis(5),
                behavior: Behavior::BotChallenge,
            }],
            fast_config(),
        );

        // Three challenge failures open the circuit.
        for _ in 0..3 {
            let _ = executor.run(&query(), &plan, QueryMode::Background).await;
        }
        assert_eq!(
            executor.health().snapshot(SourceId::Kiwi).circuit,
            farescout_core::CircuitState::Open
        );

        // With the only source short-circuited, nothing can launch.
        let err = executor
            .run(&query(), &plan, QueryMode::Background)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AllSourcesFailed));
    }

    #[tokio::test]
    async fn test_upstream_empty_is_not_an_error() {
        let (executor, plan) = executor_with(
            vec![MockAdapter {
                id: SourceId::Kiwi,
                delay: Duration::from_millis(5),
                behavior: Behavior::Empty,
            }],
            fast_config(),
        );

        let outcome = executor
            .run(&query(), &plan, QueryMode::Background)
            .await
            .unwrap();
        assert!(outcome.summary.offers.is_empty());
        assert!(outcome.summary.errors.is_empty());
    }
}
