//! Source routing.
//!
//! Given a query, current source health, and the static route-coverage
//! table, the router produces an ordered set of (source, tier) pairs:
//! primary and complementary launch immediately, fallback only when the
//! first two tiers come up empty.

use farescout_core::refdata::{AirportTable, Region};
use farescout_core::{CircuitState, Query, SourceId, SourceTier};
use farescout_store::config::{Config, TierOverride};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::health::HealthRegistry;

// ============================================================================
// Coverage Table
// ============================================================================

/// Carriers expected on a region pair. The table is symmetric and
/// hand-maintained; airline-direct sources are forced primary when their
/// carrier appears here.
fn expected_carriers(a: Region, b: Region) -> &'static [&'static str] {
    use Region::{Europe, GreaterChina, Japan, Korea, NorthAmerica, Oceania, SoutheastAsia};
    match (a, b) {
        (Korea, Japan) | (Japan, Korea) => {
            &["KE", "OZ", "7C", "TW", "LJ", "ZE", "BX", "RS", "NH", "JL"]
        }
        (Korea, SoutheastAsia) | (SoutheastAsia, Korea) => {
            &["KE", "OZ", "SQ", "TG", "VN", "7C", "TW", "LJ", "ZE"]
        }
        (Korea, GreaterChina) | (GreaterChina, Korea) => &["KE", "OZ", "CX"],
        (Korea, Europe) | (Europe, Korea) => &["KE", "OZ", "LH", "LX", "AF", "KL", "TK"],
        (Korea, NorthAmerica) | (NorthAmerica, Korea) => &["KE", "OZ"],
        (Korea, Oceania) | (Oceania, Korea) => &["KE", "OZ"],
        (Europe, Japan) | (Japan, Europe) => &["LH", "AF", "KL", "TK", "NH", "JL"],
        _ => &[],
    }
}

// ============================================================================
// Route Plan
// ============================================================================

/// Ordered launch plan for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePlan {
    /// Sources to invoke, primary tiers first.
    pub entries: Vec<(SourceId, SourceTier)>,
    /// Open-circuit sources due a health re-probe.
    pub probes: Vec<SourceId>,
}

impl RoutePlan {
    /// Sources in a given tier.
    pub fn tier(&self, tier: SourceTier) -> impl Iterator<Item = SourceId> + '_ {
        self.entries
            .iter()
            .filter(move |(_, t)| *t == tier)
            .map(|(id, _)| *id)
    }

    /// Whether the plan has nothing to launch at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Router
// ============================================================================

/// Coverage-table router.
pub struct Router {
    airports: AirportTable,
    overrides: HashMap<SourceId, TierOverride>,
    disabled: HashSet<SourceId>,
    carriers_by_source: HashMap<SourceId, &'static [&'static str]>,
}

impl Router {
    /// Builds the router from configuration and the source registry.
    pub fn new(airports: AirportTable, config: &Config) -> Self {
        let mut overrides = HashMap::new();
        let mut disabled = HashSet::new();
        let mut carriers_by_source = HashMap::new();

        for descriptor in farescout_adapters::SourceRegistry::all() {
            let section = config.adapter(descriptor.id.cli_name());
            if !section.enabled {
                disabled.insert(descriptor.id);
            }
            overrides.insert(descriptor.id, section.tier_override);
            carriers_by_source.insert(descriptor.id, descriptor.carriers);
        }

        Self {
            airports,
            overrides,
            disabled,
            carriers_by_source,
        }
    }

    /// Base tier before health rules, or `None` to skip the source.
    fn base_tier(&self, source: SourceId, expected: &[&str]) -> Option<SourceTier> {
        let carriers = self.carriers_by_source.get(&source).copied().unwrap_or(&[]);
        if carriers.is_empty() {
            // Broad-coverage sources.
            return Some(match source {
                SourceId::Amadeus => SourceTier::Complementary,
                _ => SourceTier::Primary,
            });
        }
        // Airline-direct: only when one of its carriers is expected, and
        // then always primary (the coverage table is authoritative).
        if carriers.iter().any(|c| expected.contains(c)) {
            Some(SourceTier::Primary)
        } else {
            None
        }
    }

    /// Produces the launch plan for one query.
    pub fn plan(&self, query: &Query, health: &HealthRegistry) -> RoutePlan {
        let origin_region = self.airports.region(&query.origin);
        let dest_region = self.airports.region(&query.destination);
        let expected = expected_carriers(origin_region, dest_region);

        let mut entries = Vec::new();
        let mut probes = Vec::new();

        for source in SourceId::all() {
            let source = *source;
            if self.disabled.contains(&source) {
                continue;
            }
            let Some(mut tier) = self.base_tier(source, expected) else {
                continue;
            };

            let snapshot = health.snapshot(source);
            if snapshot.circuit == CircuitState::Open {
                // Rule 1: short-circuited sources are skipped and queued
                // for a re-probe instead.
                probes.push(source);
                continue;
            }
            if snapshot.is_degraded() || health.has_structural_alert(source) {
                // Rule 2 plus automatic demotion on structural alerts.
                tier = SourceTier::Fallback;
            }

            tier = match self.overrides.get(&source).copied().unwrap_or_default() {
                TierOverride::Auto => tier,
                TierOverride::Primary => SourceTier::Primary,
                TierOverride::Complementary => SourceTier::Complementary,
                TierOverride::Fallback => SourceTier::Fallback,
            };

            entries.push((source, tier));
        }

        entries.sort_by_key(|(id, tier)| (*tier, *id));
        debug!(
            origin = %query.origin,
            destination = %query.destination,
            entries = entries.len(),
            probes = probes.len(),
            "Route plan built"
        );
        RoutePlan { entries, probes }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::CircuitConfig;
    use chrono::NaiveDate;
    use farescout_core::FailureKind;
    use farescout_fetch::BucketConfig;
    use std::time::Duration;

    fn health() -> HealthRegistry {
        let sources = SourceId::all().iter().map(|id| {
            let ladder = farescout_adapters::SourceRegistry::get(*id)
                .unwrap()
                .evasion_ladder();
            (*id, ladder, BucketConfig::default())
        });
        HealthRegistry::new(sources, CircuitConfig::default())
    }

    fn router_with(config: &Config) -> Router {
        Router::new(AirportTable::builtin(), config)
    }

    fn korea_japan_query() -> Query {
        Query::one_way("ICN", "NRT", NaiveDate::from_ymd_opt(2026, 4, 15).unwrap())
    }

    #[test]
    fn test_broad_sources_always_planned() {
        let router = router_with(&Config::default());
        let plan = router.plan(&korea_japan_query(), &health());

        let primary: Vec<SourceId> = plan.tier(SourceTier::Primary).collect();
        assert!(primary.contains(&SourceId::Google));
        assert!(primary.contains(&SourceId::Kiwi));
        let complementary: Vec<SourceId> = plan.tier(SourceTier::Complementary).collect();
        assert!(complementary.contains(&SourceId::Amadeus));
    }

    #[test]
    fn test_carrier_specific_forced_primary_on_coverage() {
        let router = router_with(&Config::default());
        let plan = router.plan(&korea_japan_query(), &health());

        // BX and ZE are expected on Korea-Japan.
        let primary: Vec<SourceId> = plan.tier(SourceTier::Primary).collect();
        assert!(primary.contains(&SourceId::AirBusan));
        assert!(primary.contains(&SourceId::Eastar));
        // No TK or LH group expected there.
        assert!(!plan.entries.iter().any(|(id, _)| *id == SourceId::Turkish));
        assert!(!plan.entries.iter().any(|(id, _)| *id == SourceId::Lufthansa));
    }

    #[test]
    fn test_europe_route_includes_group_sources() {
        let router = router_with(&Config::default());
        let query = Query::one_way("ICN", "FRA", NaiveDate::from_ymd_opt(2026, 4, 15).unwrap());
        let plan = router.plan(&query, &health());

        let primary: Vec<SourceId> = plan.tier(SourceTier::Primary).collect();
        assert!(primary.contains(&SourceId::Lufthansa));
        assert!(primary.contains(&SourceId::Sputnik));
        assert!(primary.contains(&SourceId::Turkish));
        assert!(!primary.contains(&SourceId::AirBusan));
    }

    #[test]
    fn test_open_circuit_skipped_and_probed() {
        let router = router_with(&Config::default());
        let registry = health();
        for _ in 0..3 {
            registry.record_failure(
                SourceId::Kiwi,
                FailureKind::TransientNetwork,
                Duration::from_millis(100),
            );
        }

        let plan = router.plan(&korea_japan_query(), &registry);
        assert!(!plan.entries.iter().any(|(id, _)| *id == SourceId::Kiwi));
        assert!(plan.probes.contains(&SourceId::Kiwi));
    }

    #[test]
    fn test_degraded_source_demoted() {
        let router = router_with(&Config::default());
        let registry = health();
        // One success, three failures: 25% < 50% but circuit stays
        // closed because the streak is broken.
        registry.record_failure(
            SourceId::Google,
            FailureKind::TransientNetwork,
            Duration::from_millis(100),
        );
        registry.record_success(SourceId::Google, Duration::from_millis(100));
        registry.record_failure(
            SourceId::Google,
            FailureKind::TransientNetwork,
            Duration::from_millis(100),
        );
        registry.record_failure(
            SourceId::Google,
            FailureKind::TransientNetwork,
            Duration::from_millis(100),
        );

        let plan = router.plan(&korea_japan_query(), &registry);
        let fallback: Vec<SourceId> = plan.tier(SourceTier::Fallback).collect();
        assert!(fallback.contains(&SourceId::Google));
    }

    #[test]
    fn test_disabled_source_skipped() {
        let mut config = Config::default();
        config.adapters.insert(
            "google".to_string(),
            farescout_store::AdapterConfig {
                enabled: false,
                ..farescout_store::AdapterConfig::default()
            },
        );
        let router = router_with(&config);
        let plan = router.plan(&korea_japan_query(), &health());
        assert!(!plan.entries.iter().any(|(id, _)| *id == SourceId::Google));
    }

    #[test]
    fn test_tier_override_applied() {
        let mut config = Config::default();
        config.adapters.insert(
            "kiwi".to_string(),
            farescout_store::AdapterConfig {
                enabled: true,
                tier_override: TierOverride::Fallback,
                ..farescout_store::AdapterConfig::default()
            },
        );
        let router = router_with(&config);
        let plan = router.plan(&korea_japan_query(), &health());
        let fallback: Vec<SourceId> = plan.tier(SourceTier::Fallback).collect();
        assert!(fallback.contains(&SourceId::Kiwi));
    }

    #[test]
    fn test_unknown_route_still_has_broad_sources() {
        let router = router_with(&Config::default());
        let query = Query::one_way("LAX", "JFK", NaiveDate::from_ymd_opt(2026, 4, 15).unwrap());
        let plan = router.plan(&query, &health());
        assert!(!plan.is_empty());
        // Only the broad-coverage sources qualify.
        assert!(plan
            .entries
            .iter()
            .all(|(id, _)| matches!(id, SourceId::Google | SourceId::Kiwi | SourceId::Amadeus)));
    }
}
