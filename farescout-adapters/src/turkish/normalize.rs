//! Captured-payload normalization.

use farescout_core::{CabinClass, Offer, Segment, SourceId};

use super::parser::TurkishFlight;
use crate::normalize::{NormalizeContext, NormalizeError};

/// Maps one captured flight to a canonical offer.
pub fn normalize(
    flight: &TurkishFlight,
    ctx: &NormalizeContext<'_>,
) -> Result<Offer, NormalizeError> {
    if let Some(cabin_str) = &flight.cabin {
        if CabinClass::parse(cabin_str).is_some_and(|c| c != ctx.query.cabin) {
            return Err(NormalizeError::Recoverable(format!(
                "captured cabin '{cabin_str}' does not match query"
            )));
        }
    }

    let mut segments = Vec::with_capacity(flight.segments.len());
    for seg in &flight.segments {
        let depart_utc = ctx.to_utc(&seg.origin, seg.depart_local)?;
        let arrive_utc = ctx.to_utc(&seg.destination, seg.arrive_local)?;
        let duration = (arrive_utc - depart_utc).num_minutes().max(0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        segments.push(Segment {
            marketing_carrier: seg.carrier.clone(),
            operating_carrier: seg.operating.clone(),
            flight_number: format!("{}{}", seg.carrier, seg.number),
            origin: seg.origin.clone(),
            destination: seg.destination.clone(),
            depart_utc,
            arrive_utc,
            aircraft_type: seg.aircraft.clone(),
            cabin: ctx.query.cabin,
            duration_min: duration as u32,
        });
    }

    let mut price = ctx.price(SourceId::Turkish, flight.amount, &flight.currency)?;
    price.fare_class = flight.booking_class.clone();

    Offer::new(segments, vec![price], SourceId::Turkish)
        .map_err(|e| NormalizeError::Recoverable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turkish::parser::TurkishSegment;
    use chrono::{NaiveDate, Utc};
    use farescout_core::refdata::{AirlineTable, AirportTable, FxTable};
    use farescout_core::Query;

    #[test]
    fn test_normalize_captured_flight() {
        let date = NaiveDate::from_ymd_opt(2026, 4, 15).unwrap();
        let flight = TurkishFlight {
            segments: vec![TurkishSegment {
                carrier: "TK".to_string(),
                operating: Some("TK".to_string()),
                number: "91".to_string(),
                origin: "IST".to_string(),
                destination: "ICN".to_string(),
                depart_local: date.and_hms_opt(1, 50, 0).unwrap(),
                arrive_local: date.and_hms_opt(17, 10, 0).unwrap(),
                aircraft: Some("77W".to_string()),
            }],
            amount: 512.30,
            currency: "USD".to_string(),
            cabin: Some("ECONOMY".to_string()),
            booking_class: Some("V".to_string()),
        };

        let airports = AirportTable::builtin();
        let airlines = AirlineTable::builtin();
        let fx = FxTable::builtin();
        let query = Query::one_way("IST", "ICN", date);
        let ctx = NormalizeContext {
            airports: &airports,
            airlines: &airlines,
            fx: &fx,
            query: &query,
            fetched_at: Utc::now(),
        };

        let offer = normalize(&flight, &ctx).unwrap();
        // IST is UTC+3, ICN is UTC+9: 01:50 -> 22:50 UTC prev day,
        // 17:10 -> 08:10 UTC, so 9h20m in the air.
        assert_eq!(offer.segments[0].duration_min, 560);
        assert_eq!(offer.segments[0].flight_number, "TK91");
        assert_eq!(offer.prices[0].source, SourceId::Turkish);
    }
}
