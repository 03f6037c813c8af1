//! Group best-fare normalization.

use farescout_core::{CabinClass, Offer, Segment, SourceId};

use super::parser::LhFare;
use crate::normalize::{NormalizeContext, NormalizeError};

/// Maps one group best fare to a canonical offer.
pub fn normalize(fare: &LhFare, ctx: &NormalizeContext<'_>) -> Result<Offer, NormalizeError> {
    if let Some(cabin_str) = &fare.cabin {
        if CabinClass::parse(cabin_str).is_some_and(|c| c != ctx.query.cabin) {
            return Err(NormalizeError::Recoverable(format!(
                "fare cabin '{cabin_str}' does not match query"
            )));
        }
    }

    let depart_utc = ctx.to_utc(&fare.origin, fare.depart_local)?;
    let arrive_utc = ctx.to_utc(&fare.destination, fare.arrive_local)?;
    let duration = (arrive_utc - depart_utc).num_minutes().max(0);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let segment = Segment {
        marketing_carrier: fare.carrier.clone(),
        operating_carrier: fare.operating.clone(),
        flight_number: format!("{}{}", fare.carrier, fare.flight_number),
        origin: fare.origin.clone(),
        destination: fare.destination.clone(),
        depart_utc,
        arrive_utc,
        aircraft_type: fare.aircraft.clone(),
        cabin: ctx.query.cabin,
        duration_min: duration as u32,
    };

    let mut price = ctx.price(SourceId::Lufthansa, fare.amount, &fare.currency)?;
    price.fare_class = fare.fare_class.clone();

    Offer::new(vec![segment], vec![price], SourceId::Lufthansa)
        .map_err(|e| NormalizeError::Recoverable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use farescout_core::refdata::{AirlineTable, AirportTable, FxTable};
    use farescout_core::Query;

    #[test]
    fn test_normalize_group_fare() {
        let date = NaiveDate::from_ymd_opt(2026, 4, 15).unwrap();
        let fare = LhFare {
            carrier: "LH".to_string(),
            operating: Some("LH".to_string()),
            flight_number: 713,
            origin: "ICN".to_string(),
            destination: "FRA".to_string(),
            depart_local: date.and_hms_opt(12, 5, 0).unwrap(),
            arrive_local: date.and_hms_opt(17, 40, 0).unwrap(),
            aircraft: Some("74H".to_string()),
            cabin: Some("ECONOMY".to_string()),
            fare_class: Some("K".to_string()),
            amount: 820.50,
            currency: "EUR".to_string(),
        };

        let airports = AirportTable::builtin();
        let airlines = AirlineTable::builtin();
        let fx = FxTable::builtin();
        let query = Query::one_way("ICN", "FRA", date);
        let ctx = NormalizeContext {
            airports: &airports,
            airlines: &airlines,
            fx: &fx,
            query: &query,
            fetched_at: Utc::now(),
        };

        let offer = normalize(&fare, &ctx).unwrap();
        // ICN is UTC+9, FRA is UTC+1: 12:05 -> 03:05 UTC, 17:40 -> 16:40 UTC.
        assert_eq!(offer.segments[0].duration_min, 815);
        assert_eq!(offer.segments[0].flight_number, "LH713");
        assert_eq!(offer.prices[0].currency, "EUR");
    }
}
