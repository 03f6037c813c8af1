//! Route popularity tiers.
//!
//! The tier decides cache TTLs and refresh cadence. The tables are
//! hand-maintained static data; everything not listed is long tail.

use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Route Tier
// ============================================================================

/// Popularity class of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteTier {
    /// Top routes by search volume.
    Top,
    /// Routes with steady but lower volume.
    Medium,
    /// Everything else.
    LongTail,
}

/// Top routes, refreshed most aggressively.
pub const TOP_ROUTES: &[(&str, &str)] = &[
    ("ICN", "NRT"),
    ("ICN", "KIX"),
    ("ICN", "FUK"),
    ("GMP", "HND"),
    ("ICN", "BKK"),
    ("ICN", "SGN"),
    ("ICN", "DPS"),
    ("ICN", "MNL"),
    ("ICN", "CEB"),
    ("ICN", "PVG"),
    ("ICN", "PEK"),
    ("ICN", "HKG"),
    ("ICN", "SIN"),
    ("ICN", "TPE"),
    ("ICN", "KUL"),
];

/// Medium-volume routes.
pub const MEDIUM_ROUTES: &[(&str, &str)] = &[
    ("ICN", "LAX"),
    ("ICN", "JFK"),
    ("ICN", "SFO"),
    ("ICN", "LHR"),
    ("ICN", "CDG"),
    ("ICN", "FRA"),
    ("ICN", "IST"),
    ("ICN", "SYD"),
    ("ICN", "CTS"),
    ("ICN", "NGO"),
    ("ICN", "OKA"),
    ("PUS", "NRT"),
    ("PUS", "KIX"),
    ("PUS", "FUK"),
    ("ICN", "HAN"),
    ("ICN", "DAD"),
    ("ICN", "CNX"),
    ("PUS", "BKK"),
];

/// Classifies a route into its tier.
pub fn route_tier(origin: &str, destination: &str) -> RouteTier {
    let forward = (origin, destination);
    let reverse = (destination, origin);
    let hit = |table: &[(&str, &str)]| {
        table
            .iter()
            .any(|&pair| pair == forward || pair == reverse)
    };
    if hit(TOP_ROUTES) {
        RouteTier::Top
    } else if hit(MEDIUM_ROUTES) {
        RouteTier::Medium
    } else {
        RouteTier::LongTail
    }
}

// ============================================================================
// Tier TTLs
// ============================================================================

/// Fresh/stale TTL pair for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtlPair {
    /// Milliseconds an entry serves as fresh.
    pub fresh_ms: u64,
    /// Additional milliseconds an entry serves stale-while-revalidating.
    pub stale_ms: u64,
}

/// TTLs per route tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierTtls {
    /// Top routes.
    pub top: TtlPair,
    /// Medium routes.
    pub medium: TtlPair,
    /// Long-tail routes.
    pub long_tail: TtlPair,
}

impl Default for TierTtls {
    fn default() -> Self {
        Self {
            top: TtlPair {
                fresh_ms: 5 * 60 * 1000,
                stale_ms: 15 * 60 * 1000,
            },
            medium: TtlPair {
                fresh_ms: 30 * 60 * 1000,
                stale_ms: 6 * 60 * 60 * 1000,
            },
            long_tail: TtlPair {
                fresh_ms: 6 * 60 * 60 * 1000,
                stale_ms: 24 * 60 * 60 * 1000,
            },
        }
    }
}

impl TierTtls {
    /// TTL pair for the given tier.
    pub fn for_tier(&self, tier: RouteTier) -> TtlPair {
        match tier {
            RouteTier::Top => self.top,
            RouteTier::Medium => self.medium,
            RouteTier::LongTail => self.long_tail,
        }
    }

    /// Fresh duration for a tier.
    pub fn fresh(&self, tier: RouteTier) -> Duration {
        Duration::from_millis(self.for_tier(tier).fresh_ms)
    }

    /// Stale grace duration for a tier.
    pub fn stale(&self, tier: RouteTier) -> Duration {
        Duration::from_millis(self.for_tier(tier).stale_ms)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_classification() {
        assert_eq!(route_tier("ICN", "NRT"), RouteTier::Top);
        assert_eq!(route_tier("NRT", "ICN"), RouteTier::Top);
        assert_eq!(route_tier("ICN", "LAX"), RouteTier::Medium);
        assert_eq!(route_tier("PUS", "CJU"), RouteTier::LongTail);
    }

    #[test]
    fn test_default_ttls_match_policy() {
        let ttls = TierTtls::default();
        assert_eq!(ttls.fresh(RouteTier::Top), Duration::from_secs(300));
        assert_eq!(ttls.stale(RouteTier::Top), Duration::from_secs(900));
        assert_eq!(ttls.fresh(RouteTier::Medium), Duration::from_secs(1800));
        assert_eq!(ttls.stale(RouteTier::LongTail), Duration::from_secs(86400));
    }
}
