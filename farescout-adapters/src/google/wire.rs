//! Binary query encoding for the metasearch endpoint.
//!
//! The endpoint takes its search parameters as a base64-encoded binary
//! message in the `tfs` query parameter, protobuf wire format. The
//! message is small and fixed-shape, so it is hand-encoded here: varint
//! enums plus length-delimited sub-messages.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use farescout_core::{CabinClass, Query, TripType};

// Field numbers in the `tfs` message.
const INFO_DATA: u32 = 3;
const INFO_PASSENGERS: u32 = 8;
const INFO_SEAT: u32 = 9;
const INFO_TRIP: u32 = 19;

const LEG_DATE: u32 = 2;
const LEG_FROM: u32 = 13;
const LEG_TO: u32 = 14;

const AIRPORT_CODE: u32 = 2;

// ============================================================================
// Proto Writer
// ============================================================================

/// Minimal protobuf wire writer: varints and length-delimited fields.
#[derive(Debug, Default)]
struct ProtoWriter {
    buf: Vec<u8>,
}

impl ProtoWriter {
    fn varint(&mut self, mut value: u64) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                self.buf.push(byte);
                break;
            }
            self.buf.push(byte | 0x80);
        }
    }

    fn key(&mut self, field: u32, wire_type: u8) {
        self.varint(u64::from(field) << 3 | u64::from(wire_type));
    }

    fn enum_field(&mut self, field: u32, value: u64) {
        self.key(field, 0);
        self.varint(value);
    }

    fn bytes_field(&mut self, field: u32, bytes: &[u8]) {
        self.key(field, 2);
        self.varint(bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
    }

    fn str_field(&mut self, field: u32, value: &str) {
        self.bytes_field(field, value.as_bytes());
    }

    fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

// ============================================================================
// Query Message
// ============================================================================

/// One leg of the binary query.
#[derive(Debug, Clone)]
struct Leg {
    date: String,
    from: String,
    to: String,
}

impl Leg {
    fn encode(&self) -> Vec<u8> {
        let mut w = ProtoWriter::default();
        w.str_field(LEG_DATE, &self.date);

        let mut from = ProtoWriter::default();
        from.str_field(AIRPORT_CODE, &self.from);
        w.bytes_field(LEG_FROM, &from.into_bytes());

        let mut to = ProtoWriter::default();
        to.str_field(AIRPORT_CODE, &self.to);
        w.bytes_field(LEG_TO, &to.into_bytes());

        w.into_bytes()
    }
}

fn seat_value(cabin: CabinClass) -> u64 {
    match cabin {
        CabinClass::Economy => 1,
        CabinClass::PremiumEconomy => 2,
        CabinClass::Business => 3,
        CabinClass::First => 4,
    }
}

fn trip_value(trip: TripType) -> u64 {
    match trip {
        TripType::RoundTrip => 1,
        TripType::OneWay => 2,
        TripType::MultiCity => 3,
    }
}

/// Builds the `tfs` parameter for one query.
#[derive(Debug, Clone)]
pub struct TfsQuery {
    legs: Vec<Leg>,
    seat: u64,
    trip: u64,
    passengers: Vec<u64>,
}

impl TfsQuery {
    /// Builds the message from a search query.
    pub fn from_query(query: &Query) -> Self {
        let mut legs = vec![Leg {
            date: query.departure_date.to_string(),
            from: query.origin.clone(),
            to: query.destination.clone(),
        }];
        if query.trip_type == TripType::RoundTrip {
            if let Some(return_date) = query.return_date {
                legs.push(Leg {
                    date: return_date.to_string(),
                    from: query.destination.clone(),
                    to: query.origin.clone(),
                });
            }
        }

        let p = &query.passengers;
        let mut passengers = Vec::with_capacity(usize::from(p.total()));
        passengers.extend(std::iter::repeat(1).take(usize::from(p.adults)));
        passengers.extend(std::iter::repeat(2).take(usize::from(p.children)));
        passengers.extend(std::iter::repeat(3).take(usize::from(p.infants_in_seat)));
        passengers.extend(std::iter::repeat(4).take(usize::from(p.infants_on_lap)));

        Self {
            legs,
            seat: seat_value(query.cabin),
            trip: trip_value(query.trip_type),
            passengers,
        }
    }

    /// Encodes the message to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = ProtoWriter::default();
        for leg in &self.legs {
            w.bytes_field(INFO_DATA, &leg.encode());
        }
        for p in &self.passengers {
            w.enum_field(INFO_PASSENGERS, *p);
        }
        w.enum_field(INFO_SEAT, self.seat);
        w.enum_field(INFO_TRIP, self.trip);
        w.into_bytes()
    }

    /// Encodes to the URL-safe base64 form the endpoint expects.
    pub fn as_b64(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.encode())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use farescout_core::PassengerCount;

    fn query() -> Query {
        Query::one_way("ICN", "NRT", NaiveDate::from_ymd_opt(2026, 4, 15).unwrap())
    }

    #[test]
    fn test_varint_encoding() {
        let mut w = ProtoWriter::default();
        w.varint(1);
        w.varint(300);
        assert_eq!(w.into_bytes(), vec![0x01, 0xac, 0x02]);
    }

    #[test]
    fn test_encode_contains_airports_and_date() {
        let bytes = TfsQuery::from_query(&query()).encode();
        let haystack = String::from_utf8_lossy(&bytes);
        assert!(haystack.contains("ICN"));
        assert!(haystack.contains("NRT"));
        assert!(haystack.contains("2026-04-15"));
    }

    #[test]
    fn test_round_trip_has_two_legs() {
        let q = query().with_return(NaiveDate::from_ymd_opt(2026, 4, 22).unwrap());
        let one_way_len = TfsQuery::from_query(&query()).encode().len();
        let round_trip_len = TfsQuery::from_query(&q).encode().len();
        assert!(round_trip_len > one_way_len);
    }

    #[test]
    fn test_passenger_expansion() {
        let q = query().with_passengers(PassengerCount {
            adults: 2,
            children: 1,
            infants_in_seat: 0,
            infants_on_lap: 1,
        });
        let tfs = TfsQuery::from_query(&q);
        assert_eq!(tfs.passengers, vec![1, 1, 2, 4]);
    }

    #[test]
    fn test_b64_is_url_safe() {
        let b64 = TfsQuery::from_query(&query()).as_b64();
        assert!(!b64.contains('+'));
        assert!(!b64.contains('/'));
        assert!(!b64.is_empty());
    }
}
