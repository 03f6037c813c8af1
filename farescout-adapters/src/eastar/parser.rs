//! Parser for the Eastar Jet booking-engine availability response.

use chrono::NaiveDateTime;
use farescout_fetch::FetchError;
use serde::Deserialize;
use tracing::debug;

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct AvailabilityResponse {
    #[serde(default)]
    journeys: Vec<JourneyWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JourneyWire {
    #[serde(default)]
    segments: Vec<SegmentWire>,
    #[serde(default)]
    fares: Vec<FareWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SegmentWire {
    flight_number: Option<String>,
    origin: Option<String>,
    destination: Option<String>,
    departure: Option<NaiveDateTime>,
    arrival: Option<NaiveDateTime>,
    #[serde(default)]
    aircraft_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FareWire {
    class_of_service: Option<String>,
    amount: Option<f64>,
    currency: Option<String>,
    #[serde(default)]
    available_count: Option<i64>,
}

// ============================================================================
// Parsed Types
// ============================================================================

/// One leg of a journey.
#[derive(Debug, Clone, PartialEq)]
pub struct EastarSegment {
    /// Flight number including carrier prefix.
    pub flight_number: String,
    /// Origin airport.
    pub origin: String,
    /// Destination airport.
    pub destination: String,
    /// Departure in airport-local time.
    pub depart_local: NaiveDateTime,
    /// Arrival in airport-local time.
    pub arrive_local: NaiveDateTime,
    /// Aircraft type when reported.
    pub aircraft: Option<String>,
}

/// One bookable fare on a journey.
#[derive(Debug, Clone, PartialEq)]
pub struct EastarFare {
    /// Class of service code.
    pub class_of_service: String,
    /// Fare amount.
    pub amount: f64,
    /// Fare currency.
    pub currency: String,
}

/// One journey with its fares.
#[derive(Debug, Clone, PartialEq)]
pub struct EastarJourney {
    /// Ordered legs.
    pub segments: Vec<EastarSegment>,
    /// Fares with availability.
    pub fares: Vec<EastarFare>,
}

// ============================================================================
// Parse
// ============================================================================

/// Parses an availability response into journeys.
pub fn parse_availability(body: &str) -> Result<Vec<EastarJourney>, FetchError> {
    let response: AvailabilityResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::Unusable(format!("availability shape changed: {e}")))?;

    let mut journeys = Vec::with_capacity(response.journeys.len());
    for journey in response.journeys {
        let segments: Vec<EastarSegment> = journey
            .segments
            .into_iter()
            .filter_map(|seg| {
                Some(EastarSegment {
                    flight_number: seg.flight_number?,
                    origin: seg.origin?,
                    destination: seg.destination?,
                    depart_local: seg.departure?,
                    arrive_local: seg.arrival?,
                    aircraft: seg.aircraft_type,
                })
            })
            .collect();
        let fares: Vec<EastarFare> = journey
            .fares
            .into_iter()
            .filter_map(|fare| {
                if fare.available_count.unwrap_or(1) <= 0 {
                    return None;
                }
                Some(EastarFare {
                    class_of_service: fare.class_of_service?,
                    amount: fare.amount.filter(|a| *a > 0.0)?,
                    currency: fare.currency.unwrap_or_default(),
                })
            })
            .collect();

        if segments.is_empty() || fares.is_empty() {
            continue;
        }
        journeys.push(EastarJourney { segments, fares });
    }

    debug!(count = journeys.len(), "Parsed journeys");
    Ok(journeys)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "journeys": [
            {
                "segments": [
                    {
                        "flightNumber": "ZE605",
                        "origin": "ICN", "destination": "NRT",
                        "departure": "2026-04-15T09:05:00",
                        "arrival": "2026-04-15T11:25:00",
                        "aircraftType": "B737-800"
                    }
                ],
                "fares": [
                    {"classOfService": "Y", "amount": 135000, "currency": "KRW", "availableCount": 5},
                    {"classOfService": "V", "amount": 99000, "currency": "KRW", "availableCount": 0}
                ]
            },
            {"segments": [], "fares": []}
        ]
    }"#;

    #[test]
    fn test_parse_availability() {
        let journeys = parse_availability(FIXTURE).unwrap();
        assert_eq!(journeys.len(), 1);
        let journey = &journeys[0];
        assert_eq!(journey.segments[0].flight_number, "ZE605");
        assert_eq!(journey.segments[0].aircraft.as_deref(), Some("B737-800"));
        // Sold-out V class dropped.
        assert_eq!(journey.fares.len(), 1);
        assert_eq!(journey.fares[0].amount, 135_000.0);
    }

    #[test]
    fn test_non_json_unusable() {
        assert!(matches!(
            parse_availability("<!DOCTYPE html>").unwrap_err(),
            FetchError::Unusable(_)
        ));
    }
}
