//! Engine assembly.
//!
//! Builds the whole stack from configuration: shared context (HTTP,
//! browser pool, proxy pool), adapters with credentials, health registry
//! with per-source ladders and buckets, executor, router, cache,
//! history, and the service facade on top.

use farescout_adapters::{Normalizer, SourceCredentials, SourceRegistry};
use farescout_core::refdata::AirportTable;
use farescout_fetch::{
    AdapterContext, BrowserPool, BucketConfig, HttpClient, ProxyPool,
};
use farescout_store::cache::OfferCache;
use farescout_store::config::Config;
use farescout_store::history::PriceHistory;
use farescout_store::tiers::TierTtls;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::EngineError;
use crate::executor::{ExecutorConfig, FanOutExecutor};
use crate::health::{CircuitConfig, HealthRegistry};
use crate::router::Router;
use crate::service::SearchService;

/// Builds a ready-to-serve [`SearchService`] from configuration.
///
/// The browser pool is optional at runtime: when launching Chrome fails
/// (or `browser_pool.size` is zero) automation sources simply stay
/// unavailable and everything else works.
pub async fn bootstrap(
    config: &Config,
    history_path: Option<&Path>,
) -> Result<SearchService, EngineError> {
    let browser = if config.browser_pool.size > 0 {
        let pool_config = farescout_fetch::browser::BrowserPoolConfig {
            size: config.browser_pool.size,
            chrome_executable: config.browser_pool.chrome_executable.clone(),
            headless: true,
        };
        match BrowserPool::launch(pool_config).await {
            Ok(pool) => Arc::new(pool),
            Err(e) => {
                warn!(error = %e, "Browser pool unavailable, automation sources disabled");
                Arc::new(BrowserPool::disabled())
            }
        }
    } else {
        Arc::new(BrowserPool::disabled())
    };

    let proxy = if config.proxy_pool.endpoints.is_empty() {
        Arc::new(ProxyPool::disabled())
    } else {
        Arc::new(ProxyPool::new(
            config.proxy_pool.endpoints.clone(),
            config.proxy_pool.max_concurrent,
        ))
    };

    let ctx = Arc::new(
        AdapterContext::builder()
            .http(Arc::new(HttpClient::new()))
            .browser(browser)
            .proxy(proxy)
            .build(),
    );

    let mut adapters = HashMap::new();
    let mut health_sources = Vec::new();
    let mut timeouts = HashMap::new();
    for descriptor in SourceRegistry::all() {
        let section = config.adapter(descriptor.id.cli_name());
        if !section.enabled {
            continue;
        }
        let credentials = SourceCredentials {
            api_key: section.credentials.api_key.clone(),
            client_id: section.credentials.client_id.clone(),
            client_secret: section.credentials.client_secret.clone(),
        };
        let bucket = section.rate_limit.map_or(descriptor.rate_limit, |rl| {
            BucketConfig::new(rl.capacity, rl.refill_per_sec)
        });
        let timeout = section
            .timeout_ms
            .map_or(descriptor.timeout, std::time::Duration::from_millis);
        adapters.insert(
            descriptor.id,
            descriptor.build_adapter(&credentials),
        );
        health_sources.push((descriptor.id, descriptor.evasion_ladder(), bucket));
        timeouts.insert(descriptor.id, timeout);
    }
    info!(sources = adapters.len(), "Adapters built");

    let circuit = CircuitConfig {
        failure_threshold: config.circuit.failure_threshold,
        window: std::time::Duration::from_millis(config.circuit.window_ms),
        cooldown: std::time::Duration::from_millis(config.circuit.cooldown_ms),
    };
    let health = Arc::new(HealthRegistry::new(health_sources, circuit));

    let executor = Arc::new(
        FanOutExecutor::new(
            adapters,
            ctx,
            health,
            Arc::new(Normalizer::builtin()),
            ExecutorConfig::from_settings(&config.executor),
        )
        .with_timeouts(timeouts),
    );

    let router = Arc::new(Router::new(AirportTable::builtin(), config));
    let cache = Arc::new(OfferCache::new());
    let history = match history_path {
        Some(path) => PriceHistory::open(path)?,
        None => PriceHistory::open(&PriceHistory::default_path())?,
    };
    let ttls: TierTtls = config.cache.tier_ttls.0;

    Ok(SearchService::new(
        executor,
        router,
        cache,
        Arc::new(history),
        ttls,
    ))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bootstrap_default_config() {
        let dir = tempfile_dir();
        let config = Config::default();
        let service = bootstrap(&config, Some(&dir.join("history.db")))
            .await
            .unwrap();
        // Every registered source gets an adapter by default.
        assert_eq!(
            service.executor().health().snapshots().len(),
            farescout_core::SourceId::all().len()
        );
    }

    #[tokio::test]
    async fn test_bootstrap_respects_disabled_sources() {
        let dir = tempfile_dir();
        let mut config = Config::default();
        config.adapters.insert(
            "turkish".to_string(),
            farescout_store::AdapterConfig {
                enabled: false,
                ..farescout_store::AdapterConfig::default()
            },
        );
        let service = bootstrap(&config, Some(&dir.join("history.db")))
            .await
            .unwrap();
        assert_eq!(
            service.executor().health().snapshots().len(),
            farescout_core::SourceId::all().len() - 1
        );
    }

    fn tempfile_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "farescout-test-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
