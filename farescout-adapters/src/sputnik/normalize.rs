//! Shared-tenant fare normalization.

use farescout_core::{CabinClass, Offer, Segment, SourceId};

use super::parser::SputnikFare;
use crate::normalize::{NormalizeContext, NormalizeError};

/// Maps one tenant fare to a canonical offer.
///
/// Fares in a different cabin than the query asked for are skipped; the
/// platform mixes cabins in one response.
pub fn normalize(fare: &SputnikFare, ctx: &NormalizeContext<'_>) -> Result<Offer, NormalizeError> {
    let cabin = CabinClass::parse(&fare.fare_class).ok_or_else(|| {
        NormalizeError::Recoverable(format!("unknown cabin '{}'", fare.fare_class))
    })?;
    if cabin != ctx.query.cabin {
        return Err(NormalizeError::Recoverable(format!(
            "fare cabin {cabin} does not match query"
        )));
    }

    let depart_utc = ctx.to_utc(&fare.origin, fare.depart_local)?;
    let arrive_utc = ctx.to_utc(&fare.destination, fare.arrive_local)?;
    let duration = (arrive_utc - depart_utc).num_minutes().max(0);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let segment = Segment {
        marketing_carrier: fare.carrier.clone(),
        operating_carrier: Some(fare.carrier.clone()),
        flight_number: fare.flight_number.clone(),
        origin: fare.origin.clone(),
        destination: fare.destination.clone(),
        depart_utc,
        arrive_utc,
        aircraft_type: None,
        cabin,
        duration_min: duration as u32,
    };

    let mut price = ctx.price(SourceId::Sputnik, fare.total_price, &fare.currency)?;
    price.fare_class = Some(fare.fare_class.clone());

    Offer::new(vec![segment], vec![price], SourceId::Sputnik)
        .map_err(|e| NormalizeError::Recoverable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use farescout_core::refdata::{AirlineTable, AirportTable, FxTable};
    use farescout_core::Query;

    fn fare() -> SputnikFare {
        let date = NaiveDate::from_ymd_opt(2026, 4, 15).unwrap();
        SputnikFare {
            carrier: "KL".to_string(),
            flight_number: "KL856".to_string(),
            origin: "ICN".to_string(),
            destination: "AMS".to_string(),
            depart_local: date.and_hms_opt(12, 55, 0).unwrap(),
            arrive_local: date.and_hms_opt(17, 10, 0).unwrap(),
            fare_class: "ECONOMY".to_string(),
            total_price: 1203.5,
            currency: "USD".to_string(),
        }
    }

    fn ctx_query() -> Query {
        Query::one_way("ICN", "AMS", NaiveDate::from_ymd_opt(2026, 4, 15).unwrap())
    }

    #[test]
    fn test_cross_timezone_duration() {
        let airports = AirportTable::builtin();
        let airlines = AirlineTable::builtin();
        let fx = FxTable::builtin();
        let query = ctx_query();
        let ctx = NormalizeContext {
            airports: &airports,
            airlines: &airlines,
            fx: &fx,
            query: &query,
            fetched_at: Utc::now(),
        };

        let offer = normalize(&fare(), &ctx).unwrap();
        let seg = &offer.segments[0];
        // ICN is UTC+9, AMS is UTC+1: 12:55 KST -> 03:55 UTC,
        // 17:10 CET -> 16:10 UTC, so the leg is 12h15m.
        assert_eq!(seg.duration_min, 735);
        assert_eq!(seg.operating_carrier.as_deref(), Some("KL"));
        assert!(!offer.provenance_fallback);
    }

    #[test]
    fn test_cabin_mismatch_skipped() {
        let airports = AirportTable::builtin();
        let airlines = AirlineTable::builtin();
        let fx = FxTable::builtin();
        let query = ctx_query().with_cabin(CabinClass::Business);
        let ctx = NormalizeContext {
            airports: &airports,
            airlines: &airlines,
            fx: &fx,
            query: &query,
            fetched_at: Utc::now(),
        };
        assert!(matches!(
            normalize(&fare(), &ctx),
            Err(NormalizeError::Recoverable(_))
        ));
    }
}
