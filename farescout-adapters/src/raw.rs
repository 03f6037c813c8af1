//! Raw offers.
//!
//! A [`RawOffer`] is one source-shaped itinerary plus provenance. The
//! payload is a tagged variant per adapter, so parsing stays testable in
//! isolation and the normalizer dispatches on the tag. Raw offers are
//! short-lived and never persisted.

use chrono::{DateTime, Utc};
use farescout_core::SourceId;

use crate::{airbusan, amadeus, eastar, google, kiwi, lufthansa, sputnik, turkish};

/// One raw itinerary as a source reported it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawOffer {
    /// Source that produced the payload.
    pub source: SourceId,
    /// When the payload was fetched.
    pub fetched_at: DateTime<Utc>,
    /// Source-shaped payload.
    pub payload: RawPayload,
}

impl RawOffer {
    /// Wraps a payload with provenance stamped now.
    pub fn new(source: SourceId, payload: RawPayload) -> Self {
        Self {
            source,
            fetched_at: Utc::now(),
            payload,
        }
    }
}

/// Tagged per-adapter payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    /// Decoded metasearch itinerary.
    Google(google::parser::GoogleItinerary),
    /// Aggregator itinerary.
    Kiwi(kiwi::parser::KiwiItinerary),
    /// Shared-tenant daily fare.
    Sputnik(sputnik::parser::SputnikFare),
    /// Air Busan flight with per-class fares.
    AirBusan(airbusan::parser::AirBusanFlight),
    /// Eastar journey with fares.
    Eastar(eastar::parser::EastarJourney),
    /// GDS flight offer.
    Amadeus(amadeus::parser::AmadeusOffer),
    /// Group best-fare row.
    Lufthansa(lufthansa::parser::LhFare),
    /// Browser-captured flight.
    Turkish(turkish::parser::TurkishFlight),
}

impl RawPayload {
    /// The source this payload belongs to.
    pub fn source(&self) -> SourceId {
        match self {
            Self::Google(_) => SourceId::Google,
            Self::Kiwi(_) => SourceId::Kiwi,
            Self::Sputnik(_) => SourceId::Sputnik,
            Self::AirBusan(_) => SourceId::AirBusan,
            Self::Eastar(_) => SourceId::Eastar,
            Self::Amadeus(_) => SourceId::Amadeus,
            Self::Lufthansa(_) => SourceId::Lufthansa,
            Self::Turkish(_) => SourceId::Turkish,
        }
    }
}
