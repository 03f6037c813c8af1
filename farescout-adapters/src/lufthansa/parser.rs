//! Parser for the group open-API best-fares response.
//!
//! The API wraps everything in named resource envelopes and returns a
//! single object instead of a one-element array when only one fare
//! matches; both shapes are handled.

use chrono::NaiveDateTime;
use farescout_fetch::FetchError;
use serde::Deserialize;
use tracing::debug;

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FaresEnvelope {
    fares_response: Option<FaresResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FaresResponse {
    fares: Option<FaresWrapper>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FaresWrapper {
    fare: Option<OneOrMany<FareWire>>,
}

/// Single-object-or-array quirk of the envelope format.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FareWire {
    outbound_flight: Option<FlightWire>,
    total_fare: Option<TotalFareWire>,
    cabin_class: Option<String>,
    fare_class: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FlightWire {
    departure: Option<EndpointWire>,
    arrival: Option<EndpointWire>,
    marketing_carrier: Option<CarrierWire>,
    operating_carrier: Option<CarrierWire>,
    equipment: Option<EquipmentWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EndpointWire {
    airport_code: Option<String>,
    scheduled_time_local: Option<ScheduledTimeWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ScheduledTimeWire {
    date_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CarrierWire {
    #[serde(rename = "AirlineID")]
    airline_id: Option<String>,
    flight_number: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EquipmentWire {
    aircraft_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TotalFareWire {
    amount: Option<String>,
    currency: Option<String>,
}

// ============================================================================
// Parsed Type
// ============================================================================

/// One group best fare with its outbound flight.
#[derive(Debug, Clone, PartialEq)]
pub struct LhFare {
    /// Marketing carrier (a group airline).
    pub carrier: String,
    /// Operating carrier when reported.
    pub operating: Option<String>,
    /// Numeric flight number.
    pub flight_number: u32,
    /// Origin airport.
    pub origin: String,
    /// Destination airport.
    pub destination: String,
    /// Departure in airport-local time.
    pub depart_local: NaiveDateTime,
    /// Arrival in airport-local time.
    pub arrive_local: NaiveDateTime,
    /// Aircraft type code.
    pub aircraft: Option<String>,
    /// Cabin string.
    pub cabin: Option<String>,
    /// Booking class.
    pub fare_class: Option<String>,
    /// Total fare.
    pub amount: f64,
    /// Fare currency.
    pub currency: String,
}

// ============================================================================
// Parse
// ============================================================================

/// Local times come as `2026-04-15T12:05` with or without seconds.
fn parse_local(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .ok()
}

fn endpoint(wire: EndpointWire) -> Option<(String, NaiveDateTime)> {
    let code = wire.airport_code?;
    let time = wire.scheduled_time_local?.date_time?;
    Some((code, parse_local(&time)?))
}

/// Parses a best-fares response into fare rows.
pub fn parse_best_fares(body: &str) -> Result<Vec<LhFare>, FetchError> {
    let envelope: FaresEnvelope = serde_json::from_str(body)
        .map_err(|e| FetchError::Unusable(format!("fares envelope shape changed: {e}")))?;

    let wires = envelope
        .fares_response
        .and_then(|r| r.fares)
        .and_then(|f| f.fare)
        .map(OneOrMany::into_vec)
        .unwrap_or_default();

    let mut fares = Vec::with_capacity(wires.len());
    for wire in wires {
        let Some(flight) = wire.outbound_flight else {
            continue;
        };
        let Some(total) = wire.total_fare else {
            continue;
        };
        let Some(amount) = total.amount.and_then(|a| a.parse::<f64>().ok()) else {
            continue;
        };
        let Some(marketing) = flight.marketing_carrier else {
            continue;
        };
        let (Some(carrier), Some(flight_number)) = (marketing.airline_id, marketing.flight_number)
        else {
            continue;
        };
        let (Some((origin, depart_local)), Some((destination, arrive_local))) = (
            flight.departure.and_then(endpoint),
            flight.arrival.and_then(endpoint),
        ) else {
            continue;
        };

        fares.push(LhFare {
            carrier,
            operating: flight.operating_carrier.and_then(|c| c.airline_id),
            flight_number,
            origin,
            destination,
            depart_local,
            arrive_local,
            aircraft: flight.equipment.and_then(|e| e.aircraft_code),
            cabin: wire.cabin_class,
            fare_class: wire.fare_class,
            amount,
            currency: total.currency.unwrap_or_default(),
        });
    }

    debug!(count = fares.len(), "Parsed group best fares");
    Ok(fares)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "FaresResponse": {
            "Fares": {
                "Fare": {
                    "OutboundFlight": {
                        "Departure": {
                            "AirportCode": "ICN",
                            "ScheduledTimeLocal": {"DateTime": "2026-04-15T12:05"}
                        },
                        "Arrival": {
                            "AirportCode": "FRA",
                            "ScheduledTimeLocal": {"DateTime": "2026-04-15T17:40"}
                        },
                        "MarketingCarrier": {"AirlineID": "LH", "FlightNumber": 713},
                        "OperatingCarrier": {"AirlineID": "LH"},
                        "Equipment": {"AircraftCode": "74H"}
                    },
                    "TotalFare": {"Amount": "820.50", "Currency": "EUR"},
                    "CabinClass": "ECONOMY",
                    "FareClass": "K"
                }
            }
        }
    }"#;

    #[test]
    fn test_single_fare_envelope() {
        let fares = parse_best_fares(FIXTURE).unwrap();
        assert_eq!(fares.len(), 1);

        let fare = &fares[0];
        assert_eq!(fare.carrier, "LH");
        assert_eq!(fare.flight_number, 713);
        assert_eq!(fare.amount, 820.50);
        assert_eq!(fare.currency, "EUR");
        assert_eq!(fare.aircraft.as_deref(), Some("74H"));
    }

    #[test]
    fn test_empty_envelope() {
        let fares = parse_best_fares(r#"{"FaresResponse": {"Fares": {}}}"#).unwrap();
        assert!(fares.is_empty());
    }

    #[test]
    fn test_local_time_formats() {
        assert!(parse_local("2026-04-15T12:05").is_some());
        assert!(parse_local("2026-04-15T12:05:30").is_some());
        assert!(parse_local("12:05").is_none());
    }
}
