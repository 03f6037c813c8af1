//! Human-readable text output.

use farescout_core::{Offer, Query};
use farescout_engine::SearchResponse;

/// Prints a search response as a fare table.
pub fn print_search(query: &Query, response: &SearchResponse) {
    let note = if response.partial {
        " (partial, more sources still running)"
    } else {
        ""
    };
    println!(
        "{} -> {} on {}  [{}]{note}",
        query.origin, query.destination, query.departure_date, response.cache_state,
    );

    if response.offers.is_empty() {
        println!("No offers found.");
        return;
    }

    for offer in &response.offers {
        print_offer(offer, &query.currency);
    }

    let mix: Vec<String> = response
        .source_mix
        .iter()
        .map(|(source, count)| format!("{source}:{count}"))
        .collect();
    println!("\nSources: {}", mix.join("  "));
}

fn print_offer(offer: &Offer, currency: &str) {
    let route: Vec<&str> = std::iter::once(offer.segments[0].origin.as_str())
        .chain(offer.segments.iter().map(|s| s.destination.as_str()))
        .collect();
    let flights: Vec<&str> = offer
        .segments
        .iter()
        .map(|s| s.flight_number.as_str())
        .collect();
    let stops = match offer.stops() {
        0 => "nonstop".to_string(),
        n => format!("{n} stop(s)"),
    };

    println!(
        "  {:>12.0} {currency}  {}  {}  {}  {}m  ({} quotes)",
        offer.lowest_price(),
        flights.join("+"),
        route.join("-"),
        stops,
        offer.total_duration_min(),
        offer.prices.len(),
    );
}
