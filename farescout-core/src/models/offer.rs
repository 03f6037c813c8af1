//! Canonical offer types.
//!
//! An [`Offer`] is the normalized, merge-ready representation of one
//! bookable itinerary. Offers from different sources describing the same
//! flight share a [`Fingerprint`] and are merged by the engine: their
//! prices are concatenated and the lowest converted amount wins.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::models::query::CabinClass;
use crate::models::source::SourceId;

// ============================================================================
// Segment
// ============================================================================

/// One leg of an itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Marketing carrier IATA code (e.g. `KE`).
    pub marketing_carrier: String,
    /// Operating carrier IATA code, when it differs from marketing.
    pub operating_carrier: Option<String>,
    /// Flight number including the carrier prefix (e.g. `KE901`).
    pub flight_number: String,
    /// Origin airport (IATA-3).
    pub origin: String,
    /// Destination airport (IATA-3).
    pub destination: String,
    /// Departure instant, UTC.
    pub depart_utc: DateTime<Utc>,
    /// Arrival instant, UTC.
    pub arrive_utc: DateTime<Utc>,
    /// Aircraft type when the source reports it.
    pub aircraft_type: Option<String>,
    /// Cabin class flown on this segment.
    pub cabin: CabinClass,
    /// Block time in minutes.
    pub duration_min: u32,
}

impl Segment {
    /// The carrier used for identity purposes: operating when known,
    /// marketing otherwise.
    pub fn effective_carrier(&self) -> &str {
        self.operating_carrier
            .as_deref()
            .unwrap_or(&self.marketing_carrier)
    }

    /// Departure date component (UTC).
    pub fn departure_date(&self) -> NaiveDate {
        self.depart_utc.date_naive()
    }

    /// Fingerprint component for this segment.
    fn fingerprint_part(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}",
            self.marketing_carrier,
            self.flight_number,
            self.departure_date(),
            self.origin,
            self.destination,
            self.cabin,
        )
    }

    /// Validates the segment's own invariants.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.arrive_utc <= self.depart_utc {
            return Err(CoreError::InvalidData(format!(
                "Segment {} arrives before it departs",
                self.flight_number
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Price
// ============================================================================

/// One priced quote from one source.
///
/// The original `amount`/`currency` pair is preserved exactly as the
/// source reported it; `converted_amount` is the comparison value in the
/// query currency at the stamped daily rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    /// Source that produced this quote.
    pub source: SourceId,
    /// Trust score of the source at normalization time.
    pub trust_score: u8,
    /// Amount in the source currency.
    pub amount: f64,
    /// Source currency (ISO-4217).
    pub currency: String,
    /// Amount converted to the query currency.
    pub converted_amount: f64,
    /// Whether checked baggage is included.
    pub includes_baggage: bool,
    /// Whether a meal is included.
    pub includes_meal: bool,
    /// Fare class / booking code when reported.
    pub fare_class: Option<String>,
    /// Deep link for booking, when the source provides one.
    pub booking_url: Option<String>,
    /// When this quote was fetched.
    pub fetched_at: DateTime<Utc>,
}

// ============================================================================
// Fingerprint
// ============================================================================

/// Dedup key derived from stable flight identity.
///
/// For a single-segment offer this is
/// `(marketing_carrier, flight_number, departure_date, origin,
/// destination, cabin)`; for multi-segment itineraries it is the ordered
/// tuple of segment fingerprints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Computes the fingerprint for an ordered segment sequence.
    pub fn of_segments(segments: &[Segment]) -> Self {
        let parts: Vec<String> = segments.iter().map(Segment::fingerprint_part).collect();
        Self(parts.join("|"))
    }

    /// Returns the fingerprint as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Offer
// ============================================================================

/// Canonical, merge-ready flight result.
///
/// Created by a normalizer, merged by fingerprint, immutable once it
/// enters the cache. `provenance_fallback` marks offers whose operating
/// carrier was backfilled from the marketing carrier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    /// Dedup key.
    pub fingerprint: Fingerprint,
    /// Ordered, non-empty legs.
    pub segments: Vec<Segment>,
    /// Non-empty quotes, sorted by converted amount ascending.
    pub prices: Vec<Price>,
    /// Source whose segment metadata is currently authoritative.
    pub metadata_source: SourceId,
    /// True when the operating carrier was assumed equal to marketing.
    pub provenance_fallback: bool,
}

impl Offer {
    /// Builds an offer, computing the fingerprint and sorting prices.
    ///
    /// Returns an error when segments or prices are empty, or segment
    /// chaining invariants fail.
    pub fn new(
        segments: Vec<Segment>,
        mut prices: Vec<Price>,
        metadata_source: SourceId,
    ) -> Result<Self, CoreError> {
        if segments.is_empty() {
            return Err(CoreError::InvalidData("Offer has no segments".to_string()));
        }
        if prices.is_empty() {
            return Err(CoreError::InvalidData("Offer has no prices".to_string()));
        }
        for seg in &segments {
            seg.validate()?;
        }
        for pair in segments.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.origin != prev.destination {
                return Err(CoreError::InvalidData(format!(
                    "Segment chain broken: {} -> {} then departs {}",
                    prev.origin, prev.destination, next.origin
                )));
            }
            if next.depart_utc <= prev.arrive_utc {
                return Err(CoreError::InvalidData(
                    "Segments are not chronologically ordered".to_string(),
                ));
            }
        }
        let provenance_fallback = segments.iter().any(|s| s.operating_carrier.is_none());
        let fingerprint = Fingerprint::of_segments(&segments);
        sort_prices(&mut prices);
        Ok(Self {
            fingerprint,
            segments,
            prices,
            metadata_source,
            provenance_fallback,
        })
    }

    /// Lowest price in the query currency.
    ///
    /// Prices are kept sorted, so this is the first entry.
    pub fn lowest_price(&self) -> f64 {
        self.prices[0].converted_amount
    }

    /// Total itinerary duration in minutes, including connections.
    pub fn total_duration_min(&self) -> i64 {
        let first = self.segments.first().map(|s| s.depart_utc);
        let last = self.segments.last().map(|s| s.arrive_utc);
        match (first, last) {
            (Some(dep), Some(arr)) => (arr - dep).num_minutes(),
            _ => 0,
        }
    }

    /// Number of stops (segments minus one).
    pub fn stops(&self) -> usize {
        self.segments.len().saturating_sub(1)
    }

    /// Every booking URL across all quotes.
    pub fn booking_urls(&self) -> impl Iterator<Item = &str> {
        self.prices.iter().filter_map(|p| p.booking_url.as_deref())
    }
}

/// Sorts prices by converted amount; equal amounts break ties on higher
/// trust, then earlier fetch time.
pub fn sort_prices(prices: &mut [Price]) {
    prices.sort_by(|a, b| {
        a.converted_amount
            .total_cmp(&b.converted_amount)
            .then(b.trust_score.cmp(&a.trust_score))
            .then(a.fetched_at.cmp(&b.fetched_at))
    });
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn seg(num: &str, origin: &str, dest: &str, dep_h: u32, arr_h: u32) -> Segment {
        Segment {
            marketing_carrier: num[..2].to_string(),
            operating_carrier: Some(num[..2].to_string()),
            flight_number: num.to_string(),
            origin: origin.to_string(),
            destination: dest.to_string(),
            depart_utc: Utc.with_ymd_and_hms(2026, 4, 15, dep_h, 0, 0).unwrap(),
            arrive_utc: Utc.with_ymd_and_hms(2026, 4, 15, arr_h, 0, 0).unwrap(),
            aircraft_type: None,
            cabin: CabinClass::Economy,
            duration_min: (arr_h - dep_h) * 60,
        }
    }

    fn price(source: SourceId, amount: f64) -> Price {
        Price {
            source,
            trust_score: source.trust_score(),
            amount,
            currency: "KRW".to_string(),
            converted_amount: amount,
            includes_baggage: false,
            includes_meal: false,
            fare_class: None,
            booking_url: None,
            fetched_at: Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_offer_sorts_prices() {
        let offer = Offer::new(
            vec![seg("KE901", "ICN", "NRT", 1, 3)],
            vec![
                price(SourceId::Kiwi, 420_000.0),
                price(SourceId::Google, 415_000.0),
            ],
            SourceId::Kiwi,
        )
        .unwrap();
        assert_eq!(offer.lowest_price(), 415_000.0);
        assert_eq!(offer.prices[0].source, SourceId::Google);
    }

    #[test]
    fn test_equal_amount_prefers_trust() {
        let offer = Offer::new(
            vec![seg("KE901", "ICN", "NRT", 1, 3)],
            vec![
                price(SourceId::Google, 400_000.0),
                price(SourceId::AirBusan, 400_000.0),
            ],
            SourceId::Google,
        )
        .unwrap();
        // Direct airline outranks metasearch on equal amounts.
        assert_eq!(offer.prices[0].source, SourceId::AirBusan);
    }

    #[test]
    fn test_multi_segment_fingerprint_is_ordered_tuple() {
        let a = Fingerprint::of_segments(&[
            seg("KE901", "ICN", "NRT", 1, 3),
            seg("NH101", "NRT", "HND", 5, 6),
        ]);
        let b = Fingerprint::of_segments(&[seg("KE901", "ICN", "NRT", 1, 3)]);
        assert_ne!(a, b);
        assert!(a.as_str().contains('|'));
    }

    #[test]
    fn test_rejects_broken_chain() {
        let result = Offer::new(
            vec![
                seg("KE901", "ICN", "NRT", 1, 3),
                seg("NH101", "KIX", "HND", 5, 6),
            ],
            vec![price(SourceId::Google, 100.0)],
            SourceId::Google,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_time_travel() {
        let result = Offer::new(
            vec![
                seg("KE901", "ICN", "NRT", 3, 5),
                seg("NH101", "NRT", "HND", 4, 6),
            ],
            vec![price(SourceId::Google, 100.0)],
            SourceId::Google,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_empty_prices() {
        let result = Offer::new(
            vec![seg("KE901", "ICN", "NRT", 1, 3)],
            vec![],
            SourceId::Google,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_provenance_fallback_flag() {
        let mut s = seg("KE901", "ICN", "NRT", 1, 3);
        s.operating_carrier = None;
        let offer = Offer::new(vec![s], vec![price(SourceId::Google, 100.0)], SourceId::Google)
            .unwrap();
        assert!(offer.provenance_fallback);
    }
}
