//! Offer merging.
//!
//! Groups offers by fingerprint, unions their prices, lets the
//! higher-trust source own the segment metadata, and emits a list
//! stable-sorted by lowest price then fingerprint. The merge is
//! idempotent and order-insensitive given the same multiset of inputs.

use farescout_core::models::offer::sort_prices;
use farescout_core::{Offer, SourceId};
use std::collections::BTreeMap;
use tracing::debug;

/// Merges offers sharing a fingerprint.
pub fn merge(offers: Vec<Offer>) -> Vec<Offer> {
    let input_count = offers.len();
    // BTreeMap keeps grouping deterministic regardless of arrival order.
    let mut groups: BTreeMap<farescout_core::Fingerprint, Offer> = BTreeMap::new();

    for offer in offers {
        match groups.get_mut(&offer.fingerprint) {
            None => {
                groups.insert(offer.fingerprint.clone(), offer);
            }
            Some(existing) => {
                let incoming_trust = offer.metadata_source.trust_score();
                let existing_trust = existing.metadata_source.trust_score();

                existing.prices.extend(offer.prices);
                if incoming_trust > existing_trust {
                    // Higher-trust source wins the non-price attributes.
                    existing.segments = offer.segments;
                    existing.metadata_source = offer.metadata_source;
                    existing.provenance_fallback = offer.provenance_fallback;
                }
                sort_prices(&mut existing.prices);
            }
        }
    }

    let mut merged: Vec<Offer> = groups.into_values().collect();
    merged.sort_by(|a, b| {
        a.lowest_price()
            .total_cmp(&b.lowest_price())
            .then_with(|| a.fingerprint.cmp(&b.fingerprint))
    });

    debug!(input = input_count, output = merged.len(), "Merged offers");
    merged
}

/// Price count per source across a merged offer set.
pub fn source_mix(offers: &[Offer]) -> BTreeMap<SourceId, usize> {
    let mut mix = BTreeMap::new();
    for offer in offers {
        for price in &offer.prices {
            *mix.entry(price.source).or_insert(0) += 1;
        }
    }
    mix
}

// ============================================================================
// Tests
// ============================================================================
