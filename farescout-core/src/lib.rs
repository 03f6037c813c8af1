// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Farescout Core
//!
//! Core types, models, and traits for the Farescout crawling engine.
//!
//! This crate provides the foundational abstractions used across all other
//! Farescout crates, including:
//!
//! - Domain models (queries, offers, segments, prices)
//! - Upstream source identifiers and trust ordering
//! - Failure taxonomy and source health types
//! - Error types
//! - The pluggable offer-scoring trait
//!
//! ## Key Types
//!
//! ### Query Types
//! - [`Query`] - Immutable search request descriptor
//! - [`QueryKey`] - Canonical cache key (passenger counts excluded)
//! - [`CabinClass`], [`TripType`], [`PassengerCount`]
//!
//! ### Offer Types
//! - [`Offer`] - Canonical, merge-ready flight result
//! - [`Segment`] - One leg of an itinerary
//! - [`Price`] - One priced quote from one source
//! - [`Fingerprint`] - Dedup key derived from stable flight identity
//!
//! ### Source Types
//! - [`SourceId`] - Enum of all upstream sources
//! - [`SourceVariant`] - Wire/anti-bot class of a source
//! - [`SourceTier`] - primary / complementary / fallback role
//!
//! ### Health & Failure
//! - [`FailureKind`] - Taxonomic failure classification
//! - [`CircuitState`] - Circuit breaker states
//! - [`HealthSnapshot`] - Read-side view of per-source health

pub mod error;
pub mod models;
pub mod refdata;
pub mod traits;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    // Query types
    CabinClass,
    PassengerCount,
    Query,
    QueryKey,
    QueryMode,
    TripType,
    // Offer types
    Fingerprint,
    Offer,
    Price,
    Segment,
    // Source types
    CredentialsKind,
    SourceId,
    SourceTier,
    SourceVariant,
    // Health & failure
    CircuitState,
    FailureKind,
    HealthSnapshot,
};

// Re-export reference data
pub use refdata::{AirlineInfo, AirlineTable, AirportInfo, AirportTable, FxTable, Region};

// Re-export traits
pub use traits::{LowestPriceScorer, OfferScorer};
