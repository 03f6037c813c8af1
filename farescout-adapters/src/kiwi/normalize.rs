//! Aggregator payload normalization.

use farescout_core::{Offer, Segment, SourceId};

use super::parser::KiwiItinerary;
use crate::normalize::{NormalizeContext, NormalizeError};

/// Maps one aggregator itinerary to a canonical offer.
pub fn normalize(
    itin: &KiwiItinerary,
    ctx: &NormalizeContext<'_>,
) -> Result<Offer, NormalizeError> {
    let segments: Vec<Segment> = itin
        .segments
        .iter()
        .map(|seg| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let duration_min = (seg.arrive_utc - seg.depart_utc).num_minutes().max(0) as u32;
            Segment {
                marketing_carrier: seg.carrier.clone(),
                operating_carrier: seg.operating_carrier.clone(),
                flight_number: format!("{}{}", seg.carrier, seg.flight_no),
                origin: seg.origin.clone(),
                destination: seg.destination.clone(),
                depart_utc: seg.depart_utc,
                arrive_utc: seg.arrive_utc,
                aircraft_type: None,
                cabin: ctx.query.cabin,
                duration_min,
            }
        })
        .collect();

    let mut price = ctx.price(SourceId::Kiwi, itin.price, &itin.currency)?;
    price.includes_baggage = itin.includes_baggage;
    price.booking_url = itin.booking_url.clone();
    price.fare_class = itin
        .segments
        .first()
        .and_then(|s| s.fare_category.clone());

    Offer::new(segments, vec![price], SourceId::Kiwi)
        .map_err(|e| NormalizeError::Recoverable(e.to_string()))
}
