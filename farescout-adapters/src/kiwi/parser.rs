//! Parser for aggregator search responses.

use chrono::{DateTime, Utc};
use farescout_fetch::FetchError;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct KiwiResponse {
    #[serde(default)]
    pub data: Vec<KiwiItineraryWire>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct KiwiItineraryWire {
    pub price: Option<f64>,
    #[serde(default)]
    pub deep_link: Option<String>,
    #[serde(default)]
    pub bags_price: HashMap<String, f64>,
    #[serde(default)]
    pub route: Vec<KiwiSegmentWire>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct KiwiSegmentWire {
    #[serde(rename = "flyFrom")]
    pub fly_from: String,
    #[serde(rename = "flyTo")]
    pub fly_to: String,
    /// Departure as Unix epoch (UTC).
    #[serde(rename = "dTimeUTC")]
    pub d_time_utc: i64,
    /// Arrival as Unix epoch (UTC).
    #[serde(rename = "aTimeUTC")]
    pub a_time_utc: i64,
    pub airline: String,
    pub flight_no: u32,
    #[serde(default)]
    pub operating_carrier: Option<String>,
    #[serde(default)]
    pub fare_category: Option<String>,
}

// ============================================================================
// Parsed Types
// ============================================================================

/// One aggregator segment with resolved UTC times.
#[derive(Debug, Clone, PartialEq)]
pub struct KiwiSegment {
    /// Marketing carrier.
    pub carrier: String,
    /// Operating carrier when reported and different.
    pub operating_carrier: Option<String>,
    /// Numeric flight number.
    pub flight_no: u32,
    /// Origin airport.
    pub origin: String,
    /// Destination airport.
    pub destination: String,
    /// Departure, UTC.
    pub depart_utc: DateTime<Utc>,
    /// Arrival, UTC.
    pub arrive_utc: DateTime<Utc>,
    /// Fare category code when reported.
    pub fare_category: Option<String>,
}

/// One aggregator itinerary.
///
/// The aggregator prices the itinerary as a whole; the price applies to
/// the full segment chain.
#[derive(Debug, Clone, PartialEq)]
pub struct KiwiItinerary {
    /// Itinerary price.
    pub price: f64,
    /// Price currency.
    pub currency: String,
    /// Deep link for booking.
    pub booking_url: Option<String>,
    /// Whether the first checked bag is free.
    pub includes_baggage: bool,
    /// Ordered segments.
    pub segments: Vec<KiwiSegment>,
}

// ============================================================================
// Parse
// ============================================================================

fn epoch_to_utc(epoch: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(epoch, 0)
}

/// Parses a search response body into itineraries.
///
/// Itineraries without a price or with unparseable times are skipped;
/// a body without the `data` array at all is unusable.
pub fn parse_search_response(body: &str, fallback_currency: &str) -> Result<Vec<KiwiItinerary>, FetchError> {
    let response: KiwiResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::Unusable(format!("search response shape changed: {e}")))?;

    let currency = response
        .currency
        .unwrap_or_else(|| fallback_currency.to_string());

    let mut itineraries = Vec::with_capacity(response.data.len());
    for wire in response.data {
        let Some(price) = wire.price.filter(|p| *p > 0.0) else {
            continue;
        };
        let includes_baggage = wire.bags_price.get("1").is_some_and(|p| *p == 0.0);

        let mut segments = Vec::with_capacity(wire.route.len());
        for seg in wire.route {
            let (Some(depart_utc), Some(arrive_utc)) =
                (epoch_to_utc(seg.d_time_utc), epoch_to_utc(seg.a_time_utc))
            else {
                segments.clear();
                break;
            };
            segments.push(KiwiSegment {
                operating_carrier: seg
                    .operating_carrier
                    .filter(|c| !c.is_empty() && *c != seg.airline),
                carrier: seg.airline,
                flight_no: seg.flight_no,
                origin: seg.fly_from,
                destination: seg.fly_to,
                depart_utc,
                arrive_utc,
                fare_category: seg.fare_category,
            });
        }
        if segments.is_empty() {
            continue;
        }

        itineraries.push(KiwiItinerary {
            price,
            currency: currency.clone(),
            booking_url: wire.deep_link,
            includes_baggage,
            segments,
        });
    }

    debug!(count = itineraries.len(), "Parsed aggregator itineraries");
    Ok(itineraries)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "currency": "KRW",
        "data": [
            {
                "price": 420000.0,
                "deep_link": "https://www.kiwi.com/deep?booking=abc",
                "bags_price": {"1": 0.0},
                "route": [
                    {
                        "flyFrom": "ICN", "flyTo": "NRT",
                        "dTimeUTC": 1776562200, "aTimeUTC": 1776571200,
                        "airline": "KE", "flight_no": 901,
                        "operating_carrier": "KE"
                    }
                ]
            },
            {
                "price": null,
                "route": []
            }
        ]
    }"#;

    #[test]
    fn test_parse_fixture() {
        let itineraries = parse_search_response(FIXTURE, "KRW").unwrap();
        assert_eq!(itineraries.len(), 1);

        let itin = &itineraries[0];
        assert_eq!(itin.price, 420_000.0);
        assert_eq!(itin.currency, "KRW");
        assert!(itin.includes_baggage);
        assert_eq!(itin.segments.len(), 1);
        // Operating carrier equal to marketing collapses to None.
        assert_eq!(itin.segments[0].operating_carrier, None);
    }

    #[test]
    fn test_priceless_itinerary_skipped() {
        let itineraries = parse_search_response(FIXTURE, "KRW").unwrap();
        assert_eq!(itineraries.len(), 1);
    }

    #[test]
    fn test_garbage_body_unusable() {
        let err = parse_search_response("<html>blocked</html>", "KRW").unwrap_err();
        assert!(matches!(err, FetchError::Unusable(_)));
    }

    #[test]
    fn test_distinct_operating_carrier_kept() {
        let body = r#"{"data": [{"price": 100.0, "route": [{
            "flyFrom": "ICN", "flyTo": "NRT",
            "dTimeUTC": 1776562200, "aTimeUTC": 1776571200,
            "airline": "KE", "flight_no": 5901,
            "operating_carrier": "OZ"
        }]}]}"#;
        let itineraries = parse_search_response(body, "USD").unwrap();
        assert_eq!(
            itineraries[0].segments[0].operating_carrier.as_deref(),
            Some("OZ")
        );
        assert_eq!(itineraries[0].currency, "USD");
    }
}
