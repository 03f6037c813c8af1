//! Parser for the captured booking-SPA availability payload.
//!
//! The SPA calls its internal availability API after the search form is
//! submitted; the browser hook captures that JSON verbatim. The payload
//! wraps results in `{success, data, statusDetailList}`.

use chrono::NaiveDateTime;
use farescout_fetch::FetchError;
use serde::Deserialize;
use tracing::debug;

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CapturedEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<DataWire>,
    #[serde(default)]
    status_detail_list: Vec<StatusDetailWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataWire {
    #[serde(default)]
    flight_matrix: Vec<MatrixEntryWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatrixEntryWire {
    #[serde(default)]
    segments: Vec<SegmentWire>,
    fare: Option<FareWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SegmentWire {
    marketing_carrier: Option<String>,
    operating_carrier: Option<String>,
    flight_number: Option<String>,
    origin: Option<String>,
    destination: Option<String>,
    departure_date_time: Option<NaiveDateTime>,
    arrival_date_time: Option<NaiveDateTime>,
    #[serde(default)]
    aircraft_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FareWire {
    amount: Option<f64>,
    currency: Option<String>,
    #[serde(default)]
    cabin: Option<String>,
    #[serde(default)]
    booking_class: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusDetailWire {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    translated_message: Option<String>,
}

// ============================================================================
// Parsed Types
// ============================================================================

/// One captured segment.
#[derive(Debug, Clone, PartialEq)]
pub struct TurkishSegment {
    /// Marketing carrier.
    pub carrier: String,
    /// Operating carrier when reported.
    pub operating: Option<String>,
    /// Flight number without prefix.
    pub number: String,
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

/// One captured flight with its fare.
#[derive(Debug, Clone, PartialEq)]
pub struct TurkishFlight {
    /// Ordered segments.
    pub segments: Vec<TurkishSegment>,
    /// Fare amount.
    pub amount: f64,
    /// Fare currency.
    pub currency: String,
    /// Cabin string.
    pub cabin: Option<String>,
    /// Booking class.
    pub booking_class: Option<String>,
}

// ============================================================================
// Parse
// ============================================================================

/// Parses the captured availability JSON into flights.
pub fn parse_captured(body: &str) -> Result<Vec<TurkishFlight>, FetchError> {
    let envelope: CapturedEnvelope = serde_json::from_str(body)
        .map_err(|e| FetchError::Unusable(format!("captured payload shape changed: {e}")))?;

    if !envelope.success {
        let details: Vec<String> = envelope
            .status_detail_list
            .into_iter()
            .filter_map(|d| match (d.code, d.translated_message) {
                (Some(code), Some(msg)) => Some(format!("{code}: {msg}")),
                (Some(code), None) => Some(code),
                _ => None,
            })
            .collect();
        return Err(FetchError::Unusable(format!(
            "availability API error: {}",
            details.join("; ")
        )));
    }

    let entries = envelope.data.map(|d| d.flight_matrix).unwrap_or_default();
    let mut flights = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(fare) = entry.fare else {
            continue;
        };
        let Some(amount) = fare.amount.filter(|a| *a > 0.0) else {
            continue;
        };
        let segments: Vec<TurkishSegment> = entry
            .segments
            .into_iter()
            .filter_map(|seg| {
                Some(TurkishSegment {
                    carrier: seg.marketing_carrier?,
                    operating: seg.operating_carrier,
                    number: seg.flight_number?,
                    origin: seg.origin?,
                    destination: seg.destination?,
                    depart_local: seg.departure_date_time?,
                    arrive_local: seg.arrival_date_time?,
                    aircraft: seg.aircraft_type,
                })
            })
            .collect();
        if segments.is_empty() {
            continue;
        }
        flights.push(TurkishFlight {
            segments,
            amount,
            currency: fare.currency.unwrap_or_default(),
            cabin: fare.cabin,
            booking_class: fare.booking_class,
        });
    }

    debug!(count = flights.len(), "Parsed captured flights");
    Ok(flights)
}

// ============================================================================
// Tests
// ============================================================================
