//! Metasearch payload normalization.

use farescout_core::{CabinClass, Offer, Segment, SourceId};

use super::parser::GoogleItinerary;
use crate::normalize::{NormalizeContext, NormalizeError};

/// Maps one decoded itinerary to a canonical offer.
///
/// The blob reports airport-local times without offsets; the airport
/// table resolves them to UTC. The itinerary-level price applies to the
/// whole offer.
pub fn normalize(
    itin: &GoogleItinerary,
    ctx: &NormalizeContext<'_>,
) -> Result<Offer, NormalizeError> {
    if itin.price <= 0.0 {
        return Err(NormalizeError::Recoverable(
            "itinerary has no price".to_string(),
        ));
    }

    let mut segments = Vec::with_capacity(itin.segments.len());
    for seg in &itin.segments {
        let depart_utc = ctx.to_utc(&seg.origin, seg.depart_local)?;
        let arrive_utc = ctx.to_utc(&seg.destination, seg.arrive_local)?;
        segments.push(Segment {
            marketing_carrier: seg.carrier.clone(),
            // The blob reports operators as free text ("Operated by ..."),
            // not a carrier code; identity falls back to marketing.
            operating_carrier: None,
            flight_number: format!("{}{}", seg.carrier, seg.flight_number),
            origin: seg.origin.clone(),
            destination: seg.destination.clone(),
            depart_utc,
            arrive_utc,
            aircraft_type: seg.aircraft.clone(),
            cabin: cabin_for(ctx.query.cabin),
            duration_min: seg.duration_min,
        });
    }

    let price = ctx.price(SourceId::Google, itin.price, &itin.currency)?;
    Offer::new(segments, vec![price], SourceId::Google)
        .map_err(|e| NormalizeError::Recoverable(e.to_string()))
}

fn cabin_for(requested: CabinClass) -> CabinClass {
    // The metasearch query already constrains cabin; results inherit it.
    requested
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::parser::GoogleSegment;
    use chrono::{NaiveDate, Utc};
    use farescout_core::refdata::{AirlineTable, AirportTable, FxTable};
    use farescout_core::Query;

    fn itinerary() -> GoogleItinerary {
        let date = NaiveDate::from_ymd_opt(2026, 4, 15).unwrap();
        GoogleItinerary {
            segments: vec![GoogleSegment {
                carrier: "KE".to_string(),
                carrier_name: "Korean Air".to_string(),
                flight_number: "901".to_string(),
                operator: None,
                origin: "ICN".to_string(),
                destination: "NRT".to_string(),
                depart_local: date.and_hms_opt(10, 30, 0).unwrap(),
                arrive_local: date.and_hms_opt(13, 0, 0).unwrap(),
                duration_min: 150,
                aircraft: Some("Boeing 777".to_string()),
            }],
            price: 415_000.0,
            currency: "KRW".to_string(),
        }
    }

    fn run(itin: &GoogleItinerary) -> Result<Offer, NormalizeError> {
        let airports = AirportTable::builtin();
        let airlines = AirlineTable::builtin();
        let fx = FxTable::builtin();
        let query = Query::one_way("ICN", "NRT", NaiveDate::from_ymd_opt(2026, 4, 15).unwrap());
        let ctx = NormalizeContext {
            airports: &airports,
            airlines: &airlines,
            fx: &fx,
            query: &query,
            fetched_at: Utc::now(),
        };
        normalize(itin, &ctx)
    }

    #[test]
    fn test_local_times_resolve_to_utc() {
        let offer = run(&itinerary()).unwrap();
        let seg = &offer.segments[0];
        // ICN and NRT are both UTC+9.
        assert_eq!(seg.depart_utc.format("%H:%M").to_string(), "01:30");
        assert_eq!(seg.arrive_utc.format("%H:%M").to_string(), "04:00");
        assert_eq!(seg.flight_number, "KE901");
        assert!(offer.provenance_fallback);
    }

    #[test]
    fn test_price_carried_through() {
        let offer = run(&itinerary()).unwrap();
        assert_eq!(offer.lowest_price(), 415_000.0);
        assert_eq!(offer.prices[0].source, SourceId::Google);
    }

    #[test]
    fn test_zero_price_skipped() {
        let mut itin = itinerary();
        itin.price = 0.0;
        assert!(matches!(
            run(&itin),
            Err(NormalizeError::Recoverable(_))
        ));
    }

    #[test]
    fn test_unknown_airport_recoverable() {
        let mut itin = itinerary();
        itin.segments[0].origin = "ZZZ".to_string();
        assert!(matches!(
            run(&itin),
            Err(NormalizeError::Recoverable(_))
        ));
    }
}
