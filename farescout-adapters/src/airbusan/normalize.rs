//! Air Busan payload normalization.

use farescout_core::{Offer, Price, Segment, SourceId};

use super::parser::AirBusanFlight;
use crate::normalize::{NormalizeContext, NormalizeError};

const CARRIER: &str = "BX";

/// Maps one flight with per-class fares to a canonical offer.
///
/// Every bookable class becomes its own price entry on the same offer.
pub fn normalize(
    flight: &AirBusanFlight,
    ctx: &NormalizeContext<'_>,
) -> Result<Offer, NormalizeError> {
    let depart_utc = ctx.to_utc(&flight.origin, flight.depart_local)?;
    let arrive_utc = ctx.to_utc(&flight.destination, flight.arrive_local)?;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let computed_min = (arrive_utc - depart_utc).num_minutes().max(0) as u32;
    let duration_min = if flight.duration_min > 0 {
        flight.duration_min
    } else {
        computed_min
    };

    let segment = Segment {
        marketing_carrier: CARRIER.to_string(),
        operating_carrier: Some(CARRIER.to_string()),
        flight_number: flight.flight_no.clone(),
        origin: flight.origin.clone(),
        destination: flight.destination.clone(),
        depart_utc,
        arrive_utc,
        aircraft_type: None,
        cabin: ctx.query.cabin,
        duration_min,
    };

    let mut prices: Vec<Price> = Vec::with_capacity(flight.fares.len());
    for fare in &flight.fares {
        match ctx.price(SourceId::AirBusan, fare.amount, &fare.currency) {
            Ok(mut price) => {
                price.fare_class = Some(fare.class_code.clone());
                prices.push(price);
            }
            Err(err @ NormalizeError::Unusable(_)) => return Err(err),
            Err(NormalizeError::Recoverable(_)) => continue,
        }
    }

    Offer::new(vec![segment], prices, SourceId::AirBusan)
        .map_err(|e| NormalizeError::Recoverable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airbusan::parser::AirBusanFare;
    use chrono::{NaiveDate, Utc};
    use farescout_core::refdata::{AirlineTable, AirportTable, FxTable};
    use farescout_core::Query;

    #[test]
    fn test_all_fare_classes_become_prices() {
        let date = NaiveDate::from_ymd_opt(2026, 4, 15).unwrap();
        let flight = AirBusanFlight {
            flight_no: "BX164".to_string(),
            origin: "PUS".to_string(),
            destination: "NRT".to_string(),
            depart_local: date.and_hms_opt(9, 5, 0).unwrap(),
            arrive_local: date.and_hms_opt(11, 5, 0).unwrap(),
            duration_min: 120,
            fares: vec![
                AirBusanFare {
                    class_code: "S".to_string(),
                    amount: 192_000.0,
                    currency: "KRW".to_string(),
                },
                AirBusanFare {
                    class_code: "L/1".to_string(),
                    amount: 162_000.0,
                    currency: "KRW".to_string(),
                },
            ],
        };

        let airports = AirportTable::builtin();
        let airlines = AirlineTable::builtin();
        let fx = FxTable::builtin();
        let query = Query::one_way("PUS", "NRT", date);
        let ctx = NormalizeContext {
            airports: &airports,
            airlines: &airlines,
            fx: &fx,
            query: &query,
            fetched_at: Utc::now(),
        };

        let offer = normalize(&flight, &ctx).unwrap();
        assert_eq!(offer.prices.len(), 2);
        // Cheapest class first after canonical sort.
        assert_eq!(offer.lowest_price(), 162_000.0);
        assert_eq!(offer.prices[0].fare_class.as_deref(), Some("L/1"));
        assert!(!offer.provenance_fallback);
    }
}
