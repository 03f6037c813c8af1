//! Downstream-facing search service.
//!
//! Wraps the executor with the stale-while-revalidate cache, per-key
//! single-flight, background refresh dispatch, and history writes. This
//! is the surface the API collaborator consumes. The service is a cheap
//! cloneable handle over shared state.

use farescout_core::{Offer, Query, QueryKey, QueryMode, SourceId};
use farescout_store::cache::{CacheEntry, CacheState, OfferCache};
use farescout_store::history::{HistoryRow, PriceHistory};
use farescout_store::tiers::{route_tier, TierTtls};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, instrument, warn};

use crate::error::EngineError;
use crate::executor::{CrawlSummary, FanOutExecutor};
use crate::router::Router;

// ============================================================================
// Search Response
// ============================================================================

/// One served search result.
#[derive(Debug, Clone)]
pub struct SearchResponse {
    /// Merged offers, sorted by lowest price.
    pub offers: Vec<Offer>,
    /// Where the data came from.
    pub cache_state: CacheState,
    /// True when returned under first-response-wins with sources still
    /// running; the caller may re-poll for the completed set.
    pub partial: bool,
    /// Price count per source.
    pub source_mix: BTreeMap<SourceId, usize>,
}

type SharedResult = Arc<Result<SearchResponse, EngineError>>;

// ============================================================================
// Search Service
// ============================================================================

struct ServiceInner {
    executor: Arc<FanOutExecutor>,
    router: Arc<Router>,
    cache: Arc<OfferCache>,
    history: Arc<PriceHistory>,
    ttls: TierTtls,
    inflight: Mutex<HashMap<QueryKey, watch::Receiver<Option<SharedResult>>>>,
}

/// Cache-fronted search facade over the fan-out executor.
#[derive(Clone)]
pub struct SearchService {
    inner: Arc<ServiceInner>,
}

impl SearchService {
    /// Creates the service.
    pub fn new(
        executor: Arc<FanOutExecutor>,
        router: Arc<Router>,
        cache: Arc<OfferCache>,
        history: Arc<PriceHistory>,
        ttls: TierTtls,
    ) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                executor,
                router,
                cache,
                history,
                ttls,
                inflight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// The executor (health snapshots, probes).
    pub fn executor(&self) -> &Arc<FanOutExecutor> {
        &self.inner.executor
    }

    /// The offer cache.
    pub fn cache(&self) -> &Arc<OfferCache> {
        &self.inner.cache
    }

    /// Serves one search with SWR semantics.
    ///
    /// FRESH returns immediately; STALE returns immediately and kicks a
    /// deduplicated background refresh; MISS runs a synchronous
    /// interactive fan-out with per-key single-flight.
    #[instrument(skip(self, query), fields(origin = %query.origin, destination = %query.destination))]
    pub async fn search(&self, query: &Query) -> Result<SearchResponse, EngineError> {
        query
            .validate()
            .map_err(|e| EngineError::InvalidQuery(e.to_string()))?;
        let key = query.key();
        let started = Instant::now();

        if let Some((entry, state)) = self.inner.cache.get(&key) {
            match state {
                CacheState::Fresh => {
                    debug!(key = %key, "Cache fresh");
                    self.log_search(&key, CacheState::Fresh, entry.offers.len(), false, started);
                    return Ok(Self::from_entry(&entry, CacheState::Fresh, false));
                }
                CacheState::Stale => {
                    debug!(key = %key, "Cache stale, dispatching refresh");
                    let dispatched = self.spawn_refresh(query.clone());
                    self.log_search(&key, CacheState::Stale, entry.offers.len(), false, started);
                    return Ok(Self::from_entry(&entry, CacheState::Stale, dispatched));
                }
                CacheState::Miss => {}
            }
        }

        // MISS: single-flight per key; the second caller subscribes to
        // the first's result instead of fanning out again.
        let follower_rx = {
            let mut inflight = self.inner.inflight.lock().await;
            let existing = inflight.get(&key).cloned();
            match existing {
                Some(rx) => rx,
                None => {
                    let (tx, rx) = watch::channel(None);
                    inflight.insert(key.clone(), rx);
                    drop(inflight);

                    let result = self.leader_fan_out(query, &key).await;
                    let shared: SharedResult = Arc::new(result);
                    let _ = tx.send(Some(Arc::clone(&shared)));
                    self.inner.inflight.lock().await.remove(&key);

                    let response = Self::clone_result(&shared);
                    if let Ok(response) = &response {
                        self.log_search(
                            &key,
                            CacheState::Miss,
                            response.offers.len(),
                            response.partial,
                            started,
                        );
                    }
                    return response;
                }
            }
        };

        let mut rx = follower_rx;
        loop {
            let current = rx.borrow().clone();
            if let Some(shared) = current {
                debug!(key = %key, "Joined in-flight fan-out");
                let response = Self::clone_result(&shared);
                if let Ok(response) = &response {
                    self.log_search(
                        &key,
                        CacheState::Miss,
                        response.offers.len(),
                        response.partial,
                        started,
                    );
                }
                return response;
            }
            if rx.changed().await.is_err() {
                return Err(EngineError::AllSourcesFailed);
            }
        }
    }

    /// Read-only view over the price-history store.
    pub fn prediction_data(
        &self,
        origin: &str,
        destination: &str,
        from: chrono::NaiveDate,
        to: chrono::NaiveDate,
    ) -> Result<Vec<HistoryRow>, EngineError> {
        Ok(self.inner.history.query_range(origin, destination, from, to)?)
    }

    /// Dispatches one deduplicated background refresh.
    ///
    /// Returns true when this call claimed the refresh slot.
    pub fn spawn_refresh(&self, query: Query) -> bool {
        let key = query.key();
        if !self.inner.cache.begin_refresh(&key) {
            return false;
        }
        let service = self.clone();
        tokio::spawn(async move {
            let result = service.refresh_now(&query, &key).await;
            service.inner.cache.end_refresh(&key);
            if let Err(e) = result {
                warn!(key = %key, error = %e, "Background refresh failed");
            }
        });
        true
    }

    /// Runs one deduplicated refresh to completion.
    ///
    /// Returns false when another refresh already holds the key's slot
    /// (reissuing a job for a refreshing key is a no-op) or the crawl
    /// failed.
    pub async fn refresh_query(&self, query: &Query) -> bool {
        let key = query.key();
        if !self.inner.cache.begin_refresh(&key) {
            debug!(key = %key, "Refresh already in flight");
            return false;
        }
        let result = self.refresh_now(query, &key).await;
        self.inner.cache.end_refresh(&key);
        result.is_ok()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn from_entry(entry: &CacheEntry, state: CacheState, dispatched: bool) -> SearchResponse {
        SearchResponse {
            offers: entry.offers.clone(),
            cache_state: state,
            partial: dispatched,
            source_mix: entry.source_mix.clone(),
        }
    }

    fn clone_result(shared: &SharedResult) -> Result<SearchResponse, EngineError> {
        match shared.as_ref() {
            Ok(response) => Ok(response.clone()),
            Err(EngineError::NoRoute {
                origin,
                destination,
            }) => Err(EngineError::NoRoute {
                origin: origin.clone(),
                destination: destination.clone(),
            }),
            Err(EngineError::Timeout) => Err(EngineError::Timeout),
            Err(EngineError::InvalidQuery(msg)) => Err(EngineError::InvalidQuery(msg.clone())),
            Err(_) => Err(EngineError::AllSourcesFailed),
        }
    }

    async fn leader_fan_out(
        &self,
        query: &Query,
        key: &QueryKey,
    ) -> Result<SearchResponse, EngineError> {
        let plan = self.inner.router.plan(query, self.inner.executor.health());
        if plan.is_empty() {
            return Err(EngineError::NoRoute {
                origin: query.origin.clone(),
                destination: query.destination.clone(),
            });
        }
        // Open-circuit sources get their health re-probe out of band.
        for source in plan.probes.clone() {
            let executor = Arc::clone(&self.inner.executor);
            tokio::spawn(async move {
                let _ = executor.probe(source).await;
            });
        }

        let outcome = self
            .inner
            .executor
            .run(query, &plan, QueryMode::Interactive)
            .await?;
        self.store_summary(query, key, &outcome.summary);

        if let Some(completion) = outcome.completion {
            // Stragglers update the cache entry when they land.
            let service = self.clone();
            let query = query.clone();
            let key = key.clone();
            tokio::spawn(async move {
                if let Ok(summary) = completion.await {
                    info!(key = %key, offers = summary.offers.len(), "Background crawl completed");
                    service.store_summary(&query, &key, &summary);
                }
            });
        }

        Ok(SearchResponse {
            offers: outcome.summary.offers,
            cache_state: CacheState::Miss,
            partial: outcome.partial,
            source_mix: outcome.summary.source_mix,
        })
    }

    async fn refresh_now(&self, query: &Query, key: &QueryKey) -> Result<(), EngineError> {
        let plan = self.inner.router.plan(query, self.inner.executor.health());
        if plan.is_empty() {
            return Err(EngineError::NoRoute {
                origin: query.origin.clone(),
                destination: query.destination.clone(),
            });
        }
        let outcome = self
            .inner
            .executor
            .run(query, &plan, QueryMode::Background)
            .await?;
        self.store_summary(query, key, &outcome.summary);
        Ok(())
    }

    /// Swaps the cache entry and appends history for one crawl summary.
    fn store_summary(&self, query: &Query, key: &QueryKey, summary: &CrawlSummary) {
        let tier = route_tier(&query.origin, &query.destination);
        let entry = CacheEntry::new(
            summary.offers.clone(),
            summary.source_mix.clone(),
            self.inner.ttls.fresh(tier),
            self.inner.ttls.stale(tier),
        );
        self.inner.cache.insert(key.clone(), entry);

        if summary.offers.is_empty() {
            return;
        }
        let prices: Vec<f64> = summary.offers.iter().map(Offer::lowest_price).collect();
        let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
        let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        #[allow(clippy::cast_precision_loss)]
        let avg = prices.iter().sum::<f64>() / prices.len() as f64;
        let row = HistoryRow {
            date: query.departure_date,
            origin: query.origin.clone(),
            destination: query.destination.clone(),
            cabin: query.cabin,
            min_price: min,
            avg_price: avg,
            max_price: max,
            sample_count: summary.offers.len(),
            source_mix: summary.source_mix.clone(),
            recorded_at: chrono::Utc::now(),
        };
        if let Err(e) = self.inner.history.record(&row) {
            warn!(error = %e, "History write failed");
        }
    }

    fn log_search(
        &self,
        key: &QueryKey,
        state: CacheState,
        offer_count: usize,
        partial: bool,
        started: Instant,
    ) {
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        if let Err(e) = self.inner.history.log_search(
            key.as_str(),
            &state.to_string(),
            offer_count,
            partial,
            duration_ms,
        ) {
            warn!(error = %e, "Search log write failed");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorConfig;
    use crate::health::{CircuitConfig, HealthRegistry};
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone, Utc};
    use farescout_adapters::kiwi::parser::{KiwiItinerary, KiwiSegment};
    use farescout_adapters::raw::{RawOffer, RawPayload};
    use farescout_adapters::{Adapter, Normalizer};
    use farescout_core::refdata::AirportTable;
    use farescout_fetch::{
        AdapterContext, BucketConfig, Deadline, EvasionLadder, EvasionStrategy, FetchError,
        RetryStrategy,
    };
    use farescout_store::config::Config;
    use farescout_store::tiers::TtlPair;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingAdapter {
        id: SourceId,
        delay: Duration,
        amount: f64,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Adapter for CountingAdapter {
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
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(vec![RawOffer::new(
                SourceId::Kiwi,
                RawPayload::Kiwi(KiwiItinerary {
                    price: self.amount,
                    currency: "KRW".to_string(),
                    booking_url: None,
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
            )])
        }

        async fn health_check(&self, _ctx: &AdapterContext) -> bool {
            true
        }
    }

    fn query() -> Query {
        Query::one_way("ICN", "NRT", NaiveDate::from_ymd_opt(2026, 4, 15).unwrap())
    }

    fn build_service(
        delay: Duration,
        ttls: TierTtls,
        config: &Config,
    ) -> (SearchService, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut adapters: HashMap<SourceId, Arc<dyn Adapter>> = HashMap::new();
        adapters.insert(
            SourceId::Kiwi,
            Arc::new(CountingAdapter {
                id: SourceId::Kiwi,
                delay,
                amount: 415_000.0,
                calls: Arc::clone(&calls),
            }),
        );

        let health = Arc::new(HealthRegistry::new(
            [(
                SourceId::Kiwi,
                EvasionLadder::single(EvasionStrategy::Direct),
                BucketConfig::new(20.0, 20.0),
            )],
            CircuitConfig::default(),
        ));
        let executor = Arc::new(FanOutExecutor::new(
            adapters,
            Arc::new(AdapterContext::minimal()),
            health,
            Arc::new(Normalizer::builtin()),
            ExecutorConfig {
                interactive_deadline: Duration::from_millis(800),
                background_deadline: Duration::from_secs(5),
                first_response_grace: Duration::from_millis(50),
                fallback_sub_deadline: Duration::from_millis(100),
                retry: RetryStrategy::no_retry(),
            },
        ));
        let router = Arc::new(Router::new(AirportTable::builtin(), config));
        let service = SearchService::new(
            executor,
            router,
            Arc::new(OfferCache::new()),
            Arc::new(PriceHistory::in_memory().unwrap()),
            ttls,
        );
        (service, calls)
    }

    #[tokio::test]
    async fn test_miss_then_fresh() {
        let (service, calls) = build_service(
            Duration::from_millis(5),
            TierTtls::default(),
            &Config::default(),
        );

        let first = service.search(&query()).await.unwrap();
        assert_eq!(first.cache_state, CacheState::Miss);
        assert_eq!(first.offers.len(), 1);
        assert!(!first.partial);

        let second = service.search(&query()).await.unwrap();
        assert_eq!(second.cache_state, CacheState::Fresh);
        assert_eq!(second.offers.len(), 1);

        // The fresh hit never touched the adapter again.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_serves_and_revalidates() {
        let ttls = TierTtls {
            top: TtlPair {
                fresh_ms: 30,
                stale_ms: 60_000,
            },
            ..TierTtls::default()
        };
        let (service, calls) = build_service(Duration::from_millis(5), ttls, &Config::default());

        service.search(&query()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let stale = service.search(&query()).await.unwrap();
        assert_eq!(stale.cache_state, CacheState::Stale);
        assert!(stale.partial, "background refresh dispatched");

        // Let the refresh land, then expect fresh again.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let fresh = service.search(&query()).await.unwrap();
        assert_eq!(fresh.cache_state, CacheState::Fresh);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_single_flight_dedupes_concurrent_misses() {
        let (service, calls) = build_service(
            Duration::from_millis(100),
            TierTtls::default(),
            &Config::default(),
        );

        let a = service.clone();
        let b = service.clone();
        let q = query();
        let (ra, rb) = tokio::join!(a.search(&q), b.search(&q));

        assert_eq!(ra.unwrap().offers.len(), 1);
        assert_eq!(rb.unwrap().offers.len(), 1);
        // One fan-out served both callers.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_query_dedupes() {
        let (service, _calls) = build_service(
            Duration::from_millis(5),
            TierTtls::default(),
            &Config::default(),
        );
        let q = query();
        assert!(service.cache().begin_refresh(&q.key()));
        // Slot already held: reissuing is a no-op.
        assert!(!service.refresh_query(&q).await);
        service.cache().end_refresh(&q.key());
        assert!(service.refresh_query(&q).await);
    }

    #[tokio::test]
    async fn test_invalid_query_rejected() {
        let (service, _calls) = build_service(
            Duration::from_millis(5),
            TierTtls::default(),
            &Config::default(),
        );
        let mut q = query();
        q.destination = "ICN".to_string();
        let err = service.search(&q).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_QUERY");
    }

    #[tokio::test]
    async fn test_no_route_when_everything_disabled() {
        let mut config = Config::default();
        for id in SourceId::all() {
            config.adapters.insert(
                id.cli_name().to_string(),
                farescout_store::AdapterConfig {
                    enabled: false,
                    ..farescout_store::AdapterConfig::default()
                },
            );
        }
        let (service, _calls) = build_service(
            Duration::from_millis(5),
            TierTtls::default(),
            &config,
        );
        let err = service.search(&query()).await.unwrap_err();
        assert_eq!(err.code(), "NO_ROUTE");
    }

    #[tokio::test]
    async fn test_prediction_data_reads_history() {
        let (service, _calls) = build_service(
            Duration::from_millis(5),
            TierTtls::default(),
            &Config::default(),
        );
        service.search(&query()).await.unwrap();

        let rows = service
            .prediction_data(
                "ICN",
                "NRT",
                NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 4, 30).unwrap(),
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].min_price, 415_000.0);
        assert_eq!(rows[0].sample_count, 1);
    }
}
