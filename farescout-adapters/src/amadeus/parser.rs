//! Parser for GDS flight-offers responses.

use chrono::NaiveDateTime;
use farescout_fetch::FetchError;
use serde::Deserialize;
use tracing::debug;

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct OffersResponse {
    #[serde(default)]
    data: Vec<OfferWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OfferWire {
    #[serde(default)]
    itineraries: Vec<ItineraryWire>,
    price: Option<PriceWire>,
    #[serde(default)]
    traveler_pricings: Vec<TravelerPricingWire>,
}

#[derive(Debug, Deserialize)]
struct ItineraryWire {
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    segments: Vec<SegmentWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SegmentWire {
    departure: Option<EndpointWire>,
    arrival: Option<EndpointWire>,
    carrier_code: Option<String>,
    number: Option<String>,
    #[serde(default)]
    aircraft: Option<AircraftWire>,
    #[serde(default)]
    operating: Option<OperatingWire>,
    #[serde(default)]
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EndpointWire {
    iata_code: Option<String>,
    at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
struct AircraftWire {
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperatingWire {
    carrier_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceWire {
    grand_total: Option<String>,
    total: Option<String>,
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TravelerPricingWire {
    #[serde(default)]
    fare_details_by_segment: Vec<FareDetailWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FareDetailWire {
    #[serde(default)]
    cabin: Option<String>,
    #[serde(default)]
    class: Option<String>,
}

// ============================================================================
// Parsed Types
// ============================================================================

/// One GDS segment.
#[derive(Debug, Clone, PartialEq)]
pub struct AmadeusSegment {
    /// Marketing carrier.
    pub carrier: String,
    /// Operating carrier when reported.
    pub operating: Option<String>,
    /// Flight number without the carrier prefix.
    pub number: String,
    /// Origin airport.
    pub origin: String,
    /// Destination airport.
    pub destination: String,
    /// Departure in airport-local time.
    pub depart_local: NaiveDateTime,
    /// Arrival in airport-local time.
    pub arrive_local: NaiveDateTime,
    /// Aircraft type code.
    pub aircraft: Option<String>,
    /// Segment duration in minutes, from the ISO duration.
    pub duration_min: u32,
}

/// One GDS flight offer (first itinerary of the response offer).
#[derive(Debug, Clone, PartialEq)]
pub struct AmadeusOffer {
    /// Ordered segments.
    pub segments: Vec<AmadeusSegment>,
    /// Grand total.
    pub total: f64,
    /// Price currency.
    pub currency: String,
    /// Cabin string from traveler pricing.
    pub cabin: Option<String>,
    /// Booking class from traveler pricing.
    pub fare_class: Option<String>,
}

// ============================================================================
// Parse
// ============================================================================

static DURATION_RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();

/// ISO-8601 duration to minutes (`PT2H30M` -> 150).
pub fn parse_iso_duration_min(value: &str) -> u32 {
    let re = DURATION_RE
        .get_or_init(|| regex::Regex::new(r"PT(?:(\d+)H)?(?:(\d+)M)?").expect("valid regex"));
    let Some(captures) = re.captures(value) else {
        return 0;
    };
    let hours: u32 = captures
        .get(1)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    let minutes: u32 = captures
        .get(2)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    hours * 60 + minutes
}

/// Parses a flight-offers response into GDS offers.
pub fn parse_flight_offers(body: &str) -> Result<Vec<AmadeusOffer>, FetchError> {
    let response: OffersResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::Unusable(format!("flight-offers shape changed: {e}")))?;

    let mut offers = Vec::with_capacity(response.data.len());
    for wire in response.data {
        // One-way model: the first itinerary is the outbound.
        let Some(itinerary) = wire.itineraries.into_iter().next() else {
            continue;
        };
        let Some(price) = wire.price else {
            continue;
        };
        let Some(total) = price
            .grand_total
            .or(price.total)
            .and_then(|t| t.parse::<f64>().ok())
            .filter(|t| *t > 0.0)
        else {
            continue;
        };

        let itin_duration = itinerary.duration.as_deref().map(parse_iso_duration_min);
        let segment_count = itinerary.segments.len();
        let segments: Vec<AmadeusSegment> = itinerary
            .segments
            .into_iter()
            .filter_map(|seg| {
                let departure = seg.departure?;
                let arrival = seg.arrival?;
                let duration_min = seg
                    .duration
                    .as_deref()
                    .map(parse_iso_duration_min)
                    .or(if segment_count == 1 { itin_duration } else { None })
                    .unwrap_or(0);
                Some(AmadeusSegment {
                    carrier: seg.carrier_code?,
                    operating: seg.operating.and_then(|o| o.carrier_code),
                    number: seg.number?,
                    origin: departure.iata_code?,
                    destination: arrival.iata_code?,
                    depart_local: departure.at?,
                    arrive_local: arrival.at?,
                    aircraft: seg.aircraft.and_then(|a| a.code),
                    duration_min,
                })
            })
            .collect();
        if segments.len() != segment_count || segments.is_empty() {
            continue;
        }

        let fare_detail = wire
            .traveler_pricings
            .first()
            .and_then(|tp| tp.fare_details_by_segment.first());

        offers.push(AmadeusOffer {
            segments,
            total,
            currency: price.currency.unwrap_or_default(),
            cabin: fare_detail.and_then(|fd| fd.cabin.clone()),
            fare_class: fare_detail.and_then(|fd| fd.class.clone()),
        });
    }

    debug!(count = offers.len(), "Parsed GDS offers");
    Ok(offers)
}

// ============================================================================
// Tests
// ============================================================================
