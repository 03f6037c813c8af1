//! Eastar payload normalization.

use farescout_core::{Offer, Price, Segment, SourceId};

use super::parser::EastarJourney;
use crate::normalize::{NormalizeContext, NormalizeError};

/// Maps one journey with its fares to a canonical offer.
pub fn normalize(
    journey: &EastarJourney,
    ctx: &NormalizeContext<'_>,
) -> Result<Offer, NormalizeError> {
    let mut segments = Vec::with_capacity(journey.segments.len());
    for seg in &journey.segments {
        let carrier = seg
            .flight_number
            .get(..2)
            .unwrap_or("ZE")
            .to_string();
        let depart_utc = ctx.to_utc(&seg.origin, seg.depart_local)?;
        let arrive_utc = ctx.to_utc(&seg.destination, seg.arrive_local)?;
        let duration = (arrive_utc - depart_utc).num_minutes().max(0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        segments.push(Segment {
            operating_carrier: Some(carrier.clone()),
            marketing_carrier: carrier,
            flight_number: seg.flight_number.clone(),
            origin: seg.origin.clone(),
            destination: seg.destination.clone(),
            depart_utc,
            arrive_utc,
            aircraft_type: seg.aircraft.clone(),
            cabin: ctx.query.cabin,
            duration_min: duration as u32,
        });
    }

    let mut prices: Vec<Price> = Vec::with_capacity(journey.fares.len());
    for fare in &journey.fares {
        match ctx.price(SourceId::Eastar, fare.amount, &fare.currency) {
            Ok(mut price) => {
                price.fare_class = Some(fare.class_of_service.clone());
                prices.push(price);
            }
            Err(err @ NormalizeError::Unusable(_)) => return Err(err),
            Err(NormalizeError::Recoverable(_)) => continue,
        }
    }

    Offer::new(segments, prices, SourceId::Eastar)
        .map_err(|e| NormalizeError::Recoverable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eastar::parser::{EastarFare, EastarSegment};
    use chrono::{NaiveDate, Utc};
    use farescout_core::refdata::{AirlineTable, AirportTable, FxTable};
    use farescout_core::Query;

    #[test]
    fn test_normalize_journey() {
        let date = NaiveDate::from_ymd_opt(2026, 4, 15).unwrap();
        let journey = EastarJourney {
            segments: vec![EastarSegment {
                flight_number: "ZE605".to_string(),
                origin: "ICN".to_string(),
                destination: "NRT".to_string(),
                depart_local: date.and_hms_opt(9, 5, 0).unwrap(),
                arrive_local: date.and_hms_opt(11, 25, 0).unwrap(),
                aircraft: Some("B737-800".to_string()),
            }],
            fares: vec![EastarFare {
                class_of_service: "Y".to_string(),
                amount: 135_000.0,
                currency: "KRW".to_string(),
            }],
        };

        let airports = AirportTable::builtin();
        let airlines = AirlineTable::builtin();
        let fx = FxTable::builtin();
        let query = Query::one_way("ICN", "NRT", date);
        let ctx = NormalizeContext {
            airports: &airports,
            airlines: &airlines,
            fx: &fx,
            query: &query,
            fetched_at: Utc::now(),
        };

        let offer = normalize(&journey, &ctx).unwrap();
        assert_eq!(offer.segments[0].marketing_carrier, "ZE");
        assert_eq!(offer.segments[0].duration_min, 140);
        assert_eq!(offer.lowest_price(), 135_000.0);
        assert_eq!(offer.prices[0].fare_class.as_deref(), Some("Y"));
    }

    #[test]
    fn test_missing_currency_unusable() {
        let date = NaiveDate::from_ymd_opt(2026, 4, 15).unwrap();
        let journey = EastarJourney {
            segments: vec![EastarSegment {
                flight_number: "ZE605".to_string(),
                origin: "ICN".to_string(),
                destination: "NRT".to_string(),
                depart_local: date.and_hms_opt(9, 5, 0).unwrap(),
                arrive_local: date.and_hms_opt(11, 25, 0).unwrap(),
                aircraft: None,
            }],
            fares: vec![EastarFare {
                class_of_service: "Y".to_string(),
                amount: 135_000.0,
                currency: String::new(),
            }],
        };

        let airports = AirportTable::builtin();
        let airlines = AirlineTable::builtin();
        let fx = FxTable::builtin();
        let query = Query::one_way("ICN", "NRT", date);
        let ctx = NormalizeContext {
            airports: &airports,
            airlines: &airlines,
            fx: &fx,
            query: &query,
            fetched_at: Utc::now(),
        };

        assert!(matches!(
            normalize(&journey, &ctx),
            Err(NormalizeError::Unusable(_))
        ));
    }
}
