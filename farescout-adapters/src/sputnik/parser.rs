//! Parser for shared-tenant fare-platform responses.
//!
//! The platform returns fares across its whole route network sorted by
//! price, regardless of the origin/destination hints in the request body;
//! filtering to the requested route and date happens here.

use chrono::{NaiveDate, NaiveDateTime};
use farescout_core::Query;
use farescout_fetch::FetchError;
use serde::Deserialize;
use tracing::debug;

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct FareSearchResponse {
    #[serde(default)]
    fares: Vec<FareWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FareWire {
    outbound_flight: Option<FlightWire>,
    price_specification: Option<PriceWire>,
    departure_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlightWire {
    carrier_code: Option<String>,
    flight_number: Option<String>,
    departure_airport_iata_code: Option<String>,
    arrival_airport_iata_code: Option<String>,
    departure_date_time: Option<NaiveDateTime>,
    arrival_date_time: Option<NaiveDateTime>,
    fare_class: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceWire {
    total_price: Option<f64>,
    currency_code: Option<String>,
}

// ============================================================================
// Parsed Type
// ============================================================================

/// One tenant fare matching the requested route and date.
#[derive(Debug, Clone, PartialEq)]
pub struct SputnikFare {
    /// Carrier (tenant airline).
    pub carrier: String,
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
    /// Cabin string as the platform reports it.
    pub fare_class: String,
    /// Total fare.
    pub total_price: f64,
    /// Fare currency.
    pub currency: String,
}

// ============================================================================
// Parse
// ============================================================================

/// Parses a tenant fare-search response, keeping fares on the queried
/// route and departure date.
pub fn parse_fare_response(body: &str, query: &Query) -> Result<Vec<SputnikFare>, FetchError> {
    let response: FareSearchResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::Unusable(format!("fare response shape changed: {e}")))?;

    let mut fares = Vec::new();
    for wire in response.fares {
        let Some(flight) = wire.outbound_flight else {
            continue;
        };
        let Some(price) = wire.price_specification else {
            continue;
        };
        let (Some(origin), Some(destination)) = (
            flight.departure_airport_iata_code,
            flight.arrival_airport_iata_code,
        ) else {
            continue;
        };
        if origin != query.origin || destination != query.destination {
            continue;
        }
        if wire.departure_date != Some(query.departure_date) {
            continue;
        }
        let (Some(carrier), Some(number)) = (flight.carrier_code, flight.flight_number) else {
            continue;
        };
        let (Some(depart_local), Some(arrive_local)) =
            (flight.departure_date_time, flight.arrival_date_time)
        else {
            continue;
        };
        let Some(total_price) = price.total_price.filter(|p| *p > 0.0) else {
            continue;
        };

        fares.push(SputnikFare {
            flight_number: format!("{carrier}{}", number.trim_start_matches('0')),
            carrier,
            origin,
            destination,
            depart_local,
            arrive_local,
            fare_class: flight.fare_class.unwrap_or_else(|| "ECONOMY".to_string()),
            total_price,
            currency: price.currency_code.unwrap_or_default(),
        });
    }

    debug!(count = fares.len(), "Parsed tenant fares for route");
    Ok(fares)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> Query {
        Query::one_way("ICN", "AMS", NaiveDate::from_ymd_opt(2026, 4, 15).unwrap())
    }

    const FIXTURE: &str = r#"{
        "fares": [
            {
                "outboundFlight": {
                    "carrierCode": "KL",
                    "flightNumber": "0856",
                    "departureAirportIataCode": "ICN",
                    "arrivalAirportIataCode": "AMS",
                    "departureDateTime": "2026-04-15T12:55:00",
                    "arrivalDateTime": "2026-04-15T17:10:00",
                    "fareClass": "ECONOMY"
                },
                "priceSpecification": {"totalPrice": 1203.5, "currencyCode": "USD"},
                "departureDate": "2026-04-15"
            },
            {
                "outboundFlight": {
                    "carrierCode": "KL",
                    "flightNumber": "0812",
                    "departureAirportIataCode": "AMS",
                    "arrivalAirportIataCode": "SIN",
                    "departureDateTime": "2026-04-15T09:00:00",
                    "arrivalDateTime": "2026-04-16T05:00:00",
                    "fareClass": "ECONOMY"
                },
                "priceSpecification": {"totalPrice": 700.0, "currencyCode": "USD"},
                "departureDate": "2026-04-15"
            },
            {
                "outboundFlight": {
                    "carrierCode": "KL",
                    "flightNumber": "0856",
                    "departureAirportIataCode": "ICN",
                    "arrivalAirportIataCode": "AMS",
                    "departureDateTime": "2026-04-20T12:55:00",
                    "arrivalDateTime": "2026-04-20T17:10:00",
                    "fareClass": "ECONOMY"
                },
                "priceSpecification": {"totalPrice": 990.0, "currencyCode": "USD"},
                "departureDate": "2026-04-20"
            }
        ]
    }"#;

    #[test]
    fn test_filters_route_and_date() {
        let fares = parse_fare_response(FIXTURE, &query()).unwrap();
        assert_eq!(fares.len(), 1);
        let fare = &fares[0];
        assert_eq!(fare.flight_number, "KL856");
        assert_eq!(fare.total_price, 1203.5);
        assert_eq!(fare.currency, "USD");
    }

    #[test]
    fn test_empty_fares_ok() {
        let fares = parse_fare_response(r#"{"fares": []}"#, &query()).unwrap();
        assert!(fares.is_empty());
    }

    #[test]
    fn test_html_body_unusable() {
        let err = parse_fare_response("<html>challenge</html>", &query()).unwrap_err();
        assert!(matches!(err, FetchError::Unusable(_)));
    }
}
