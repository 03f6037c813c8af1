//! Background refresh scheduling.
//!
//! A periodic task seeds refresh jobs for the popular-route tables at a
//! cadence derived from their tier. Jobs are deduplicated by the cache's
//! refresh slots (reissuing a refreshing key is a no-op) and bounded by
//! a global semaphore so bulk refresh never starves interactive load.

use chrono::Utc;
use farescout_core::Query;
use farescout_store::tiers::{MEDIUM_ROUTES, TOP_ROUTES};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::service::SearchService;

// ============================================================================
// Config
// ============================================================================

/// Scheduler cadence and bounds.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Tick interval; top routes refresh every tick.
    pub tick: Duration,
    /// Medium routes refresh every Nth tick.
    pub medium_every: u32,
    /// Departure-date offsets (days ahead) seeded per route.
    pub days_ahead: Vec<u32>,
    /// Maximum concurrently running refresh jobs.
    pub max_concurrent: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(10 * 60),
            medium_every: 12,
            days_ahead: vec![3, 7, 14, 30, 60],
            max_concurrent: 4,
        }
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Periodic refresh seeder over the popularity tables.
pub struct RefreshScheduler {
    service: SearchService,
    config: RefreshConfig,
}

impl RefreshScheduler {
    /// Creates the scheduler.
    pub fn new(service: SearchService, config: RefreshConfig) -> Self {
        Self { service, config }
    }

    /// Spawns the scheduler loop.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.tick);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut tick_count: u32 = 0;
            loop {
                ticker.tick().await;
                tick_count = tick_count.wrapping_add(1);
                let include_medium = tick_count % self.config.medium_every.max(1) == 0;
                self.run_once(include_medium).await;
            }
        })
    }

    /// Seeds and runs one round of refresh jobs.
    pub async fn run_once(&self, include_medium: bool) {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let today = Utc::now().date_naive();

        let mut routes: Vec<(&str, &str)> = TOP_ROUTES.to_vec();
        if include_medium {
            routes.extend_from_slice(MEDIUM_ROUTES);
        }
        info!(
            routes = routes.len(),
            include_medium, "Refresh round starting"
        );

        let mut jobs = Vec::new();
        for (origin, destination) in routes {
            for days in &self.config.days_ahead {
                let date = today + chrono::Duration::days(i64::from(*days));
                let query = Query::one_way(origin, destination, date);

                let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                    return;
                };
                let service = self.service.clone();
                jobs.push(tokio::spawn(async move {
                    let _permit = permit;
                    let refreshed = service.refresh_query(&query).await;
                    debug!(
                        origin = %query.origin,
                        destination = %query.destination,
                        date = %query.departure_date,
                        refreshed,
                        "Refresh job finished"
                    );
                }));
            }
        }
        for job in jobs {
            let _ = job.await;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cadence() {
        let config = RefreshConfig::default();
        assert_eq!(config.tick, Duration::from_secs(600));
        assert!(config.max_concurrent >= 1);
        assert!(!config.days_ahead.is_empty());
    }
}
