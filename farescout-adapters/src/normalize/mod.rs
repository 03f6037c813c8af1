//! Normalization of raw payloads into canonical offers.
//!
//! Each source module supplies a pure function from its payload variant
//! to an [`Offer`]; this module owns the dispatch and the shared context
//! (airport offsets, stamped FX rates, the query). Normalization is
//! deterministic: the same payload, tables, and query always produce the
//! same offer.

use chrono::{DateTime, NaiveDateTime, Utc};
use farescout_core::refdata::{AirlineTable, AirportTable, FxTable};
use farescout_core::{Offer, Price, Query, SourceId};
use thiserror::Error;
use tracing::debug;

use crate::raw::{RawOffer, RawPayload};
use crate::{airbusan, amadeus, eastar, google, kiwi, lufthansa, sputnik, turkish};

// ============================================================================
// Normalize Error
// ============================================================================

/// Error from normalizing one raw offer.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// This offer is malformed; siblings are unaffected.
    #[error("Recoverable parse error: {0}")]
    Recoverable(String),

    /// The payload cannot be used at all (e.g. missing price currency).
    #[error("Unusable payload: {0}")]
    Unusable(String),
}

// ============================================================================
// Normalize Context
// ============================================================================

/// Shared lookup context for one normalization batch.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext<'a> {
    /// Airport table for timezone resolution.
    pub airports: &'a AirportTable,
    /// Airline table for carrier disambiguation.
    pub airlines: &'a AirlineTable,
    /// Stamped daily FX table.
    pub fx: &'a FxTable,
    /// The query being answered.
    pub query: &'a Query,
    /// Fetch timestamp stamped on produced prices.
    pub fetched_at: DateTime<Utc>,
}

impl NormalizeContext<'_> {
    /// Resolves an airport-local time to UTC via the offset table.
    pub fn to_utc(&self, iata: &str, local: NaiveDateTime) -> Result<DateTime<Utc>, NormalizeError> {
        let offset_min = self.airports.utc_offset_min(iata).ok_or_else(|| {
            NormalizeError::Recoverable(format!("unknown airport '{iata}'"))
        })?;
        let utc = local - chrono::Duration::minutes(i64::from(offset_min));
        Ok(DateTime::from_naive_utc_and_offset(utc, Utc))
    }

    /// Converts an amount into the query currency at the stamped rate.
    ///
    /// An empty currency is unusable; an unknown one skips the offer.
    pub fn convert(&self, amount: f64, currency: &str) -> Result<f64, NormalizeError> {
        if currency.is_empty() {
            return Err(NormalizeError::Unusable(
                "price has no currency".to_string(),
            ));
        }
        self.fx
            .convert(amount, currency, &self.query.currency)
            .ok_or_else(|| {
                NormalizeError::Recoverable(format!("no FX rate for '{currency}'"))
            })
    }

    /// Builds a price entry in canonical form.
    pub fn price(
        &self,
        source: SourceId,
        amount: f64,
        currency: &str,
    ) -> Result<Price, NormalizeError> {
        let converted = self.convert(amount, currency)?;
        Ok(Price {
            source,
            trust_score: source.trust_score(),
            amount,
            currency: currency.to_string(),
            converted_amount: converted,
            includes_baggage: false,
            includes_meal: false,
            fare_class: None,
            booking_url: None,
            fetched_at: self.fetched_at,
        })
    }
}

// ============================================================================
// Normalizer
// ============================================================================

/// Per-source normalization dispatch over the reference tables.
#[derive(Debug, Clone)]
pub struct Normalizer {
    airports: AirportTable,
    airlines: AirlineTable,
    fx: FxTable,
}

impl Normalizer {
    /// Creates a normalizer over explicit tables.
    pub fn new(airports: AirportTable, airlines: AirlineTable, fx: FxTable) -> Self {
        Self {
            airports,
            airlines,
            fx,
        }
    }

    /// Creates a normalizer over the built-in reference data.
    pub fn builtin() -> Self {
        Self::new(
            AirportTable::builtin(),
            AirlineTable::builtin(),
            FxTable::builtin(),
        )
    }

    /// The FX table in use.
    pub fn fx(&self) -> &FxTable {
        &self.fx
    }

    /// Normalizes one raw offer.
    pub fn normalize(&self, raw: &RawOffer, query: &Query) -> Result<Offer, NormalizeError> {
        let ctx = NormalizeContext {
            airports: &self.airports,
            airlines: &self.airlines,
            fx: &self.fx,
            query,
            fetched_at: raw.fetched_at,
        };
        match &raw.payload {
            RawPayload::Google(p) => google::normalize::normalize(p, &ctx),
            RawPayload::Kiwi(p) => kiwi::normalize::normalize(p, &ctx),
            RawPayload::Sputnik(p) => sputnik::normalize::normalize(p, &ctx),
            RawPayload::AirBusan(p) => airbusan::normalize::normalize(p, &ctx),
            RawPayload::Eastar(p) => eastar::normalize::normalize(p, &ctx),
            RawPayload::Amadeus(p) => amadeus::normalize::normalize(p, &ctx),
            RawPayload::Lufthansa(p) => lufthansa::normalize::normalize(p, &ctx),
            RawPayload::Turkish(p) => turkish::normalize::normalize(p, &ctx),
        }
    }

    /// Normalizes a batch, skipping recoverable failures.
    ///
    /// Returns the offers plus the number skipped. An unusable payload
    /// aborts the batch: the source's whole response is suspect.
    pub fn normalize_batch(
        &self,
        raws: &[RawOffer],
        query: &Query,
    ) -> Result<(Vec<Offer>, usize), NormalizeError> {
        let mut offers = Vec::with_capacity(raws.len());
        let mut skipped = 0usize;
        for raw in raws {
            match self.normalize(raw, query) {
                Ok(offer) => offers.push(offer),
                Err(NormalizeError::Recoverable(reason)) => {
                    debug!(source = %raw.source, %reason, "Skipping malformed offer");
                    skipped += 1;
                }
                Err(unusable @ NormalizeError::Unusable(_)) => return Err(unusable),
            }
        }
        Ok((offers, skipped))
    }
}
