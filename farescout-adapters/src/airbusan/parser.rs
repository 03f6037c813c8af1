//! Parser for the Air Busan availability endpoint.
//!
//! The response nests flights inside itinerary fares; every flight lists
//! its bookable fare classes with per-adult base prices. Tax and fuel
//! surcharge sit once at the response root and apply to every fare.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use farescout_fetch::FetchError;
use serde::Deserialize;
use tracing::{debug, warn};

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvailResponse {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_desc: Option<String>,
    #[serde(default)]
    list_itinerary_fare: Vec<ItineraryFareWire>,
    #[serde(default)]
    pub_tax_fuel: Option<TaxFuelWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItineraryFareWire {
    #[serde(default)]
    dep_date: Option<String>,
    #[serde(default)]
    list_flight: Vec<FlightWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlightWire {
    #[serde(default)]
    flight_no: Option<String>,
    #[serde(default)]
    dep_date: Option<String>,
    #[serde(default)]
    arr_date: Option<String>,
    #[serde(default)]
    dep_time: Option<String>,
    #[serde(default)]
    arr_time: Option<String>,
    #[serde(default)]
    dep_city: Option<String>,
    #[serde(default)]
    arr_city: Option<String>,
    #[serde(default)]
    flying_minute: Option<u32>,
    #[serde(default)]
    list_cls: Vec<ClassWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassWire {
    #[serde(default)]
    cls: Option<String>,
    #[serde(default)]
    sub_cls: Option<String>,
    #[serde(default)]
    price_ad: Option<f64>,
    #[serde(default)]
    avail: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaxFuelWire {
    #[serde(default)]
    tax_ad: Option<f64>,
    #[serde(default)]
    fuel_ad: Option<f64>,
}

// ============================================================================
// Parsed Types
// ============================================================================

/// One bookable fare class on a flight.
#[derive(Debug, Clone, PartialEq)]
pub struct AirBusanFare {
    /// Fare class code (`S/L/A/E`, with optional sub-class).
    pub class_code: String,
    /// Per-adult total: base fare plus tax and fuel.
    pub amount: f64,
    /// Fare currency.
    pub currency: String,
}

/// One flight with its bookable fares.
#[derive(Debug, Clone, PartialEq)]
pub struct AirBusanFlight {
    /// Flight number (e.g. `BX164`).
    pub flight_no: String,
    /// Origin airport.
    pub origin: String,
    /// Destination airport.
    pub destination: String,
    /// Departure in Korea local time.
    pub depart_local: NaiveDateTime,
    /// Arrival in destination local time.
    pub arrive_local: NaiveDateTime,
    /// Block time in minutes.
    pub duration_min: u32,
    /// Fares with seats available.
    pub fares: Vec<AirBusanFare>,
}

// ============================================================================
// Parse
// ============================================================================

/// Parses `YYYYMMDD` + `HHMM` into a local datetime.
fn parse_local(date: &str, time: &str) -> Option<NaiveDateTime> {
    let d = NaiveDate::parse_from_str(date, "%Y%m%d").ok()?;
    let t = NaiveTime::parse_from_str(time, "%H%M").ok()?;
    Some(NaiveDateTime::new(d, t))
}

/// Parses an availability response into flights with per-class fares.
pub fn parse_avail_response(
    body: &str,
    fallback_origin: &str,
    fallback_destination: &str,
) -> Result<Vec<AirBusanFlight>, FetchError> {
    let response: AvailResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::Unusable(format!("availability shape changed: {e}")))?;

    if let Some(code) = response.error_code.filter(|c| !c.is_empty()) {
        let desc = response.error_desc.unwrap_or_default();
        return Err(FetchError::Unusable(format!(
            "booking API error {code}: {desc}"
        )));
    }

    let tax_fuel = response.pub_tax_fuel.unwrap_or_default();
    let surcharge = tax_fuel.tax_ad.unwrap_or(0.0) + tax_fuel.fuel_ad.unwrap_or(0.0);

    let mut flights = Vec::new();
    for itinerary in response.list_itinerary_fare {
        let itin_dep_date = itinerary.dep_date.unwrap_or_default();
        for flight in itinerary.list_flight {
            let Some(flight_no) = flight.flight_no.filter(|f| !f.is_empty()) else {
                continue;
            };
            let dep_date = flight.dep_date.unwrap_or_else(|| itin_dep_date.clone());
            let arr_date = flight.arr_date.unwrap_or_else(|| dep_date.clone());
            let dep_time = flight.dep_time.unwrap_or_else(|| "0000".to_string());
            let arr_time = flight.arr_time.unwrap_or_else(|| "0000".to_string());

            let (Some(depart_local), Some(arrive_local)) = (
                parse_local(&dep_date, &dep_time),
                parse_local(&arr_date, &arr_time),
            ) else {
                warn!(flight = %flight_no, "Invalid date/time, skipping flight");
                continue;
            };

            let fares: Vec<AirBusanFare> = flight
                .list_cls
                .into_iter()
                .filter_map(|cls| {
                    let base = cls.price_ad.filter(|p| *p > 0.0)?;
                    if cls.avail.unwrap_or(0) <= 0 {
                        return None;
                    }
                    let code = match (cls.cls, cls.sub_cls) {
                        (Some(c), Some(s)) if !s.is_empty() => format!("{c}/{s}"),
                        (Some(c), _) => c,
                        (None, _) => return None,
                    };
                    Some(AirBusanFare {
                        class_code: code,
                        amount: base + surcharge,
                        currency: cls.currency.unwrap_or_else(|| "KRW".to_string()),
                    })
                })
                .collect();
            if fares.is_empty() {
                continue;
            }

            flights.push(AirBusanFlight {
                flight_no,
                origin: flight
                    .dep_city
                    .unwrap_or_else(|| fallback_origin.to_string()),
                destination: flight
                    .arr_city
                    .unwrap_or_else(|| fallback_destination.to_string()),
                depart_local,
                arrive_local,
                duration_min: flight.flying_minute.unwrap_or(0),
                fares,
            });
        }
    }

    debug!(count = flights.len(), "Parsed availability flights");
    Ok(flights)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "listItineraryFare": [
            {
                "depDate": "20260415",
                "listFlight": [
                    {
                        "flightNo": "BX164",
                        "depDate": "20260415", "arrDate": "20260415",
                        "depTime": "0905", "arrTime": "1105",
                        "depCity": "PUS", "arrCity": "NRT",
                        "flyingMinute": 120,
                        "listCls": [
                            {"cls": "S", "priceAd": 150000, "avail": 9, "currency": "KRW"},
                            {"cls": "L", "subCls": "1", "priceAd": 120000, "avail": 4, "currency": "KRW"},
                            {"cls": "E", "priceAd": 90000, "avail": 0, "currency": "KRW"}
                        ]
                    }
                ]
            }
        ],
        "pubTaxFuel": {"taxAd": 28000, "fuelAd": 14000}
    }"#;

    #[test]
    fn test_parse_avail() {
        let flights = parse_avail_response(FIXTURE, "PUS", "NRT").unwrap();
        assert_eq!(flights.len(), 1);

        let flight = &flights[0];
        assert_eq!(flight.flight_no, "BX164");
        assert_eq!(flight.duration_min, 120);
        // Sold-out class E dropped; others carry tax + fuel.
        assert_eq!(flight.fares.len(), 2);
        assert_eq!(flight.fares[0].class_code, "S");
        assert_eq!(flight.fares[0].amount, 192_000.0);
        assert_eq!(flight.fares[1].class_code, "L/1");
        assert_eq!(flight.fares[1].amount, 162_000.0);
    }

    #[test]
    fn test_api_error_is_unusable() {
        let body = r#"{"errorCode": "E4011", "errorDesc": "session expired"}"#;
        let err = parse_avail_response(body, "PUS", "NRT").unwrap_err();
        assert!(matches!(err, FetchError::Unusable(_)));
    }

    #[test]
    fn test_empty_itineraries_ok() {
        let flights = parse_avail_response(r#"{"listItineraryFare": []}"#, "PUS", "NRT").unwrap();
        assert!(flights.is_empty());
    }
}
