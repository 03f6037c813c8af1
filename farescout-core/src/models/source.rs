//! Upstream source identifiers and classification.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Source Id
// ============================================================================

/// Supported upstream sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    /// Binary-encoded metasearch endpoint.
    Google,
    /// Aggregator search API.
    Kiwi,
    /// Multi-tenant fare platform shared by several airlines.
    Sputnik,
    /// Air Busan booking API.
    AirBusan,
    /// Eastar Jet booking engine API.
    Eastar,
    /// Amadeus GDS flight-offers API.
    Amadeus,
    /// Lufthansa Group open API.
    Lufthansa,
    /// Turkish Airlines via browser automation.
    Turkish,
}

impl SourceId {
    /// Returns all source ids in registry order.
    pub fn all() -> &'static [SourceId] {
        &[
            Self::Google,
            Self::Kiwi,
            Self::Sputnik,
            Self::AirBusan,
            Self::Eastar,
            Self::Amadeus,
            Self::Lufthansa,
            Self::Turkish,
        ]
    }

    /// Returns the display name for this source.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Google => "Google Flights",
            Self::Kiwi => "Kiwi Tequila",
            Self::Sputnik => "Sputnik Fares",
            Self::AirBusan => "Air Busan",
            Self::Eastar => "Eastar Jet",
            Self::Amadeus => "Amadeus",
            Self::Lufthansa => "Lufthansa Group",
            Self::Turkish => "Turkish Airlines",
        }
    }

    /// Returns the CLI name for this source (lowercase, no spaces).
    pub fn cli_name(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Kiwi => "kiwi",
            Self::Sputnik => "sputnik",
            Self::AirBusan => "airbusan",
            Self::Eastar => "eastar",
            Self::Amadeus => "amadeus",
            Self::Lufthansa => "lufthansa",
            Self::Turkish => "turkish",
        }
    }

    /// Parses a CLI name back into a source id.
    pub fn from_cli_name(name: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|s| s.cli_name() == name.to_ascii_lowercase())
    }

    /// The wire/anti-bot class this source belongs to.
    pub fn variant(&self) -> SourceVariant {
        match self {
            Self::Google => SourceVariant::BinaryMetasearch,
            Self::Kiwi => SourceVariant::AggregatorApi,
            Self::Sputnik => SourceVariant::SharedTenantKey,
            Self::AirBusan | Self::Eastar => SourceVariant::PerAirlineReverse,
            Self::Amadeus => SourceVariant::GdsSdk,
            Self::Lufthansa => SourceVariant::OfficialApi,
            Self::Turkish => SourceVariant::BrowserAutomation,
        }
    }

    /// Trust score used for merge tie-breaks. Higher wins.
    ///
    /// Ordering: direct-airline > official-API > shared-tenant > GDS >
    /// aggregator > metasearch > browser-scrape. The numeric scale is a
    /// calibration constant, not a contract.
    pub fn trust_score(&self) -> u8 {
        match self.variant() {
            SourceVariant::PerAirlineReverse => 60,
            SourceVariant::OfficialApi => 50,
            SourceVariant::SharedTenantKey => 45,
            SourceVariant::GdsSdk => 40,
            SourceVariant::AggregatorApi => 30,
            SourceVariant::BinaryMetasearch => 20,
            SourceVariant::BrowserAutomation => 10,
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cli_name())
    }
}

// ============================================================================
// Source Variant
// ============================================================================

/// Wire protocol / anti-bot class of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceVariant {
    /// Base64 binary message over HTTP GET, impersonating client.
    BinaryMetasearch,
    /// REST plus API key.
    AggregatorApi,
    /// Shared tenant id, one endpoint serving several airlines.
    SharedTenantKey,
    /// Undocumented per-airline JSON endpoint.
    PerAirlineReverse,
    /// GDS over OAuth2.
    GdsSdk,
    /// Real browser instance driving the airline's site.
    BrowserAutomation,
    /// Official API with OAuth2 client-credentials.
    OfficialApi,
}

impl SourceVariant {
    /// Returns the display name for this variant.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::BinaryMetasearch => "binary metasearch",
            Self::AggregatorApi => "aggregator API",
            Self::SharedTenantKey => "shared tenant",
            Self::PerAirlineReverse => "direct airline",
            Self::GdsSdk => "GDS",
            Self::BrowserAutomation => "browser automation",
            Self::OfficialApi => "official API",
        }
    }
}

// ============================================================================
// Source Tier
// ============================================================================

/// Role of a source in one fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTier {
    /// Expected to have direct answers; always invoked.
    Primary,
    /// Covers gaps; invoked in parallel with primary.
    Complementary,
    /// Invoked only when primary + complementary come up empty.
    Fallback,
}

impl fmt::Display for SourceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Primary => "primary",
            Self::Complementary => "complementary",
            Self::Fallback => "fallback",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Credentials Kind
// ============================================================================

/// What kind of credentials a source needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialsKind {
    /// No credentials required.
    None,
    /// Static API key.
    ApiKey,
    /// OAuth2 client-credentials pair.
    Oauth,
    /// Public key shared across tenants of one platform.
    SharedKey,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trust_ordering() {
        assert!(SourceId::AirBusan.trust_score() > SourceId::Lufthansa.trust_score());
        assert!(SourceId::Lufthansa.trust_score() > SourceId::Amadeus.trust_score());
        assert!(SourceId::Amadeus.trust_score() > SourceId::Kiwi.trust_score());
        assert!(SourceId::Kiwi.trust_score() > SourceId::Google.trust_score());
        assert!(SourceId::Google.trust_score() > SourceId::Turkish.trust_score());
    }

    #[test]
    fn test_cli_name_round_trip() {
        for id in SourceId::all() {
            assert_eq!(SourceId::from_cli_name(id.cli_name()), Some(*id));
        }
        assert_eq!(SourceId::from_cli_name("nope"), None);
    }

    #[test]
    fn test_all_variants_covered() {
        let variants: std::collections::HashSet<_> =
            SourceId::all().iter().map(|s| s.variant()).collect();
        assert_eq!(variants.len(), 7);
    }
}
