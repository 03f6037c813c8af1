//! Parser for the metasearch results page.
//!
//! Results are embedded in the page as a JS data blob: a deeply nested
//! list structure where meaning is positional. The decoder walks fixed
//! index paths; the per-itinerary price rides separately as a small
//! base64 protobuf summary.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use farescout_fetch::FetchError;
use serde_json::Value;
use tracing::{debug, warn};

// ============================================================================
// Decoded Types
// ============================================================================

/// One decoded leg.
#[derive(Debug, Clone, PartialEq)]
pub struct GoogleSegment {
    /// Marketing carrier code.
    pub carrier: String,
    /// Marketing carrier display name.
    pub carrier_name: String,
    /// Flight number without the carrier prefix.
    pub flight_number: String,
    /// Operator description when the leg is a codeshare.
    pub operator: Option<String>,
    /// Origin airport.
    pub origin: String,
    /// Destination airport.
    pub destination: String,
    /// Departure in airport-local time.
    pub depart_local: NaiveDateTime,
    /// Arrival in airport-local time.
    pub arrive_local: NaiveDateTime,
    /// Block time in minutes.
    pub duration_min: u32,
    /// Aircraft type when reported.
    pub aircraft: Option<String>,
}

/// One decoded itinerary with its summary price.
#[derive(Debug, Clone, PartialEq)]
pub struct GoogleItinerary {
    /// Ordered legs.
    pub segments: Vec<GoogleSegment>,
    /// Itinerary price.
    pub price: f64,
    /// Price currency.
    pub currency: String,
}

// ============================================================================
// Nested-list access
// ============================================================================

fn at<'a>(value: &'a Value, path: &[usize]) -> Option<&'a Value> {
    let mut current = value;
    for &idx in path {
        current = current.as_array()?.get(idx)?;
    }
    Some(current)
}

fn str_at(value: &Value, path: &[usize]) -> Option<String> {
    at(value, path)?.as_str().map(ToString::to_string)
}

fn u32_at(value: &Value, path: &[usize]) -> Option<u32> {
    at(value, path)?.as_u64().and_then(|v| u32::try_from(v).ok())
}

fn tuple3_at(value: &Value, path: &[usize]) -> Option<(i32, u32, u32)> {
    let arr = at(value, path)?.as_array()?;
    Some((
        i32::try_from(arr.first()?.as_i64()?).ok()?,
        u32::try_from(arr.get(1)?.as_i64()?).ok()?,
        u32::try_from(arr.get(2)?.as_i64()?).ok()?,
    ))
}

fn tuple2_at(value: &Value, path: &[usize]) -> Option<(u32, u32)> {
    let arr = at(value, path)?.as_array()?;
    // Hour/minute entries may be absent for on-the-hour times.
    let hour = arr.first().and_then(Value::as_u64).unwrap_or(0);
    let minute = arr.get(1).and_then(Value::as_u64).unwrap_or(0);
    Some((u32::try_from(hour).ok()?, u32::try_from(minute).ok()?))
}

fn local_datetime(date: (i32, u32, u32), time: (u32, u32)) -> Option<NaiveDateTime> {
    let d = NaiveDate::from_ymd_opt(date.0, date.1, date.2)?;
    let t = NaiveTime::from_hms_opt(time.0, time.1, 0)?;
    Some(NaiveDateTime::new(d, t))
}

// ============================================================================
// Itinerary summary (base64 protobuf)
// ============================================================================

struct ProtoReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ProtoReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn varint(&mut self) -> Option<u64> {
        let mut value: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = *self.buf.get(self.pos)?;
            self.pos += 1;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Some(value);
            }
            shift += 7;
            if shift > 63 {
                return None;
            }
        }
    }

    fn bytes(&mut self) -> Option<&'a [u8]> {
        let len = usize::try_from(self.varint()?).ok()?;
        let end = self.pos.checked_add(len)?;
        let slice = self.buf.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn skip(&mut self, wire_type: u64) -> Option<()> {
        match wire_type {
            0 => {
                self.varint()?;
            }
            1 => self.pos = self.pos.checked_add(8)?,
            2 => {
                self.bytes()?;
            }
            5 => self.pos = self.pos.checked_add(4)?,
            _ => return None,
        }
        Some(())
    }
}

/// Decodes the per-itinerary summary: price (in hundredths) and currency.
fn decode_summary(b64: &str) -> Option<(f64, String)> {
    let raw = STANDARD.decode(b64).ok()?;
    let mut reader = ProtoReader::new(&raw);
    while reader.pos < reader.buf.len() {
        let key = reader.varint()?;
        let (field, wire_type) = (key >> 3, key & 0x7);
        if field == 2 && wire_type == 2 {
            // Price sub-message: 1 = amount in hundredths, 2 = currency.
            let inner = reader.bytes()?;
            let mut price_reader = ProtoReader::new(inner);
            let mut amount: Option<u64> = None;
            let mut currency: Option<String> = None;
            while price_reader.pos < price_reader.buf.len() {
                let inner_key = price_reader.varint()?;
                match (inner_key >> 3, inner_key & 0x7) {
                    (1, 0) => amount = price_reader.varint(),
                    (2, 2) => {
                        currency = price_reader
                            .bytes()
                            .and_then(|b| String::from_utf8(b.to_vec()).ok());
                    }
                    (_, wt) => price_reader.skip(wt)?,
                }
            }
            #[allow(clippy::cast_precision_loss)]
            return Some((amount? as f64 / 100.0, currency.unwrap_or_default()));
        }
        reader.skip(wire_type)?;
    }
    None
}

// ============================================================================
// Script extraction
// ============================================================================

/// Pulls the results data array out of the page's `ds:1` script block.
fn extract_data_blob(html: &str) -> Option<&str> {
    let script_start = html.find("class=\"ds:1\"")?;
    let tail = &html[script_start..];
    let data_start = tail.find("data:")? + "data:".len();
    let tail = &tail[data_start..];
    let open = tail.find('[')?;

    // Balanced-bracket scan; the blob contains strings with brackets.
    let bytes = tail.as_bytes();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&tail[open..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

// ============================================================================
// Flight & itinerary decode
// ============================================================================

// Positional indices within one flight element.
const F_OPERATOR: usize = 2;
const F_DEP_AIRPORT: usize = 3;
const F_ARR_AIRPORT: usize = 5;
const F_DEP_TIME: usize = 8;
const F_ARR_TIME: usize = 10;
const F_TRAVEL_TIME: usize = 11;
const F_AIRCRAFT: usize = 17;
const F_DEP_DATE: usize = 20;
const F_ARR_DATE: usize = 21;
const F_AIRLINE: usize = 22;

fn decode_flight(el: &Value) -> Option<GoogleSegment> {
    let carrier = str_at(el, &[F_AIRLINE, 0])?;
    let flight_number = str_at(el, &[F_AIRLINE, 1])?;
    let carrier_name = str_at(el, &[F_AIRLINE, 3]).unwrap_or_default();
    let depart_local = local_datetime(
        tuple3_at(el, &[F_DEP_DATE])?,
        tuple2_at(el, &[F_DEP_TIME])?,
    )?;
    let arrive_local = local_datetime(
        tuple3_at(el, &[F_ARR_DATE])?,
        tuple2_at(el, &[F_ARR_TIME])?,
    )?;

    Some(GoogleSegment {
        carrier,
        carrier_name,
        flight_number,
        operator: str_at(el, &[F_OPERATOR]).filter(|s| !s.is_empty()),
        origin: str_at(el, &[F_DEP_AIRPORT])?,
        destination: str_at(el, &[F_ARR_AIRPORT])?,
        depart_local,
        arrive_local,
        duration_min: u32_at(el, &[F_TRAVEL_TIME]).unwrap_or(0),
        aircraft: str_at(el, &[F_AIRCRAFT]).filter(|s| !s.is_empty()),
    })
}

fn decode_itinerary(el: &Value) -> Option<GoogleItinerary> {
    let flights = at(el, &[0, 2])?.as_array()?;
    let segments: Vec<GoogleSegment> = flights.iter().filter_map(decode_flight).collect();
    if segments.is_empty() {
        return None;
    }
    let summary_b64 = str_at(el, &[1, 1])?;
    let (price, currency) = decode_summary(&summary_b64)?;
    Some(GoogleItinerary {
        segments,
        price,
        currency,
    })
}

/// Parses the full results page into itineraries.
///
/// A page without the data script is a structural failure; individual
/// itineraries that fail to decode are skipped.
pub fn parse_results_page(html: &str) -> Result<Vec<GoogleItinerary>, FetchError> {
    let blob = extract_data_blob(html)
        .ok_or_else(|| FetchError::Unusable("results data script not found".to_string()))?;
    let data: Value = serde_json::from_str(blob)
        .map_err(|e| FetchError::Unusable(format!("results blob is not JSON: {e}")))?;

    let mut itineraries = Vec::new();
    let mut skipped = 0usize;
    for group_path in [&[2usize, 0usize], &[3usize, 0usize]] {
        let Some(group) = at(&data, group_path).and_then(Value::as_array) else {
            continue;
        };
        for el in group {
            match decode_itinerary(el) {
                Some(itin) => itineraries.push(itin),
                None => skipped += 1,
            }
        }
    }

    if skipped > 0 {
        warn!(skipped, "Some itineraries failed to decode");
    }
    debug!(count = itineraries.len(), "Decoded metasearch itineraries");
    Ok(itineraries)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Encodes a summary protobuf for fixtures: price message with
    /// hundredths amount and currency.
    fn summary_b64(price_hundredths: u64, currency: &str) -> String {
        fn varint(buf: &mut Vec<u8>, mut v: u64) {
            loop {
                let b = (v & 0x7f) as u8;
                v >>= 7;
                if v == 0 {
                    buf.push(b);
                    break;
                }
                buf.push(b | 0x80);
            }
        }
        let mut inner = Vec::new();
        inner.push(0x08); // field 1, varint
        varint(&mut inner, price_hundredths);
        inner.push(0x12); // field 2, bytes
        varint(&mut inner, currency.len() as u64);
        inner.extend_from_slice(currency.as_bytes());

        let mut outer = Vec::new();
        outer.push(0x12); // field 2, bytes
        varint(&mut outer, inner.len() as u64);
        outer.extend_from_slice(&inner);
        STANDARD.encode(outer)
    }

    fn flight_el() -> Value {
        // Positional layout mirroring the live blob; unused slots null.
        let mut el = vec![Value::Null; 23];
        el[F_OPERATOR] = Value::Null;
        el[F_DEP_AIRPORT] = "ICN".into();
        el[4] = "Incheon International Airport".into();
        el[F_ARR_AIRPORT] = "NRT".into();
        el[6] = "Narita International Airport".into();
        el[F_DEP_TIME] = serde_json::json!([10, 30]);
        el[F_ARR_TIME] = serde_json::json!([13, 0]);
        el[F_TRAVEL_TIME] = 150.into();
        el[F_AIRCRAFT] = "Boeing 777".into();
        el[F_DEP_DATE] = serde_json::json!([2026, 4, 15]);
        el[F_ARR_DATE] = serde_json::json!([2026, 4, 15]);
        el[F_AIRLINE] = serde_json::json!(["KE", "901", null, "Korean Air"]);
        Value::Array(el)
    }

    fn results_html(price_hundredths: u64, currency: &str) -> String {
        let itinerary = serde_json::json!([
            [null, null, [flight_el()]],
            [null, summary_b64(price_hundredths, currency)]
        ]);
        let data = serde_json::json!([null, null, [[itinerary]], [[]]]);
        format!(
            "<html><body><script class=\"ds:1\">AF_initDataCallback({{key: 'ds:1', data:{data}, sideChannel: {{}}}});</script></body></html>"
        )
    }

    #[test]
    fn test_parse_results_page() {
        let html = results_html(41_500_000, "KRW");
        let itineraries = parse_results_page(&html).unwrap();
        assert_eq!(itineraries.len(), 1);

        let itin = &itineraries[0];
        assert_eq!(itin.price, 415_000.0);
        assert_eq!(itin.currency, "KRW");
        assert_eq!(itin.segments.len(), 1);

        let seg = &itin.segments[0];
        assert_eq!(seg.carrier, "KE");
        assert_eq!(seg.flight_number, "901");
        assert_eq!(seg.origin, "ICN");
        assert_eq!(seg.destination, "NRT");
        assert_eq!(seg.duration_min, 150);
        assert_eq!(seg.aircraft.as_deref(), Some("Boeing 777"));
        assert_eq!(seg.depart_local.format("%H:%M").to_string(), "10:30");
    }

    #[test]
    fn test_missing_script_is_unusable() {
        let err = parse_results_page("<html><body>blocked</body></html>").unwrap_err();
        assert!(matches!(err, FetchError::Unusable(_)));
    }

    #[test]
    fn test_summary_decode() {
        let b64 = summary_b64(12_345, "USD");
        let (price, currency) = decode_summary(&b64).unwrap();
        assert_eq!(price, 123.45);
        assert_eq!(currency, "USD");
    }

    #[test]
    fn test_broken_itinerary_skipped() {
        // Second itinerary has no flights array and must be skipped.
        let good = serde_json::json!([
            [null, null, [flight_el()]],
            [null, summary_b64(100, "USD")]
        ]);
        let bad = serde_json::json!([[null, null, null], [null, "not-base64!"]]);
        let data = serde_json::json!([null, null, [[good, bad]], [[]]]);
        let html = format!("<script class=\"ds:1\">{{data:{data}}}</script>");
        let itineraries = parse_results_page(&html).unwrap();
        assert_eq!(itineraries.len(), 1);
    }
}
