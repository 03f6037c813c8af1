//! GDS payload normalization.

use farescout_core::{CabinClass, Offer, Segment, SourceId};

use super::parser::AmadeusOffer;
use crate::normalize::{NormalizeContext, NormalizeError};

/// Maps one GDS offer to a canonical offer.
pub fn normalize(offer: &AmadeusOffer, ctx: &NormalizeContext<'_>) -> Result<Offer, NormalizeError> {
    if let Some(cabin_str) = &offer.cabin {
        let cabin = CabinClass::parse(cabin_str);
        if cabin.is_some_and(|c| c != ctx.query.cabin) {
            return Err(NormalizeError::Recoverable(format!(
                "offer cabin '{cabin_str}' does not match query"
            )));
        }
    }

    let mut segments = Vec::with_capacity(offer.segments.len());
    for seg in &offer.segments {
        let depart_utc = ctx.to_utc(&seg.origin, seg.depart_local)?;
        let arrive_utc = ctx.to_utc(&seg.destination, seg.arrive_local)?;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let computed_min = (arrive_utc - depart_utc).num_minutes().max(0) as u32;
        let duration_min = if seg.duration_min > 0 {
            seg.duration_min
        } else {
            computed_min
        };
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
            duration_min,
        });
    }

    let mut price = ctx.price(SourceId::Amadeus, offer.total, &offer.currency)?;
    price.fare_class = offer.fare_class.clone();

    Offer::new(segments, vec![price], SourceId::Amadeus)
        .map_err(|e| NormalizeError::Recoverable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amadeus::parser::AmadeusSegment;
    use chrono::{NaiveDate, Utc};
    use farescout_core::refdata::{AirlineTable, AirportTable, FxTable};
    use farescout_core::Query;

    #[test]
    fn test_normalize_gds_offer() {
        let date = NaiveDate::from_ymd_opt(2026, 4, 15).unwrap();
        let offer = AmadeusOffer {
            segments: vec![AmadeusSegment {
                carrier: "KE".to_string(),
                operating: Some("KE".to_string()),
                number: "901".to_string(),
                origin: "ICN".to_string(),
                destination: "NRT".to_string(),
                depart_local: date.and_hms_opt(10, 30, 0).unwrap(),
                arrive_local: date.and_hms_opt(13, 0, 0).unwrap(),
                aircraft: Some("77W".to_string()),
                duration_min: 150,
            }],
            total: 298.40,
            currency: "USD".to_string(),
            cabin: Some("ECONOMY".to_string()),
            fare_class: Some("Q".to_string()),
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

        let result = normalize(&offer, &ctx).unwrap();
        assert_eq!(result.segments[0].flight_number, "KE901");
        assert_eq!(result.prices[0].amount, 298.40);
        assert_eq!(result.prices[0].currency, "USD");
        // Converted into the KRW query currency.
        assert!(result.lowest_price() > 298.40);
    }
}
