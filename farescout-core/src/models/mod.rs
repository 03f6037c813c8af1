//! Domain models for the crawling engine.

pub mod health;
pub mod offer;
pub mod query;
pub mod source;

pub use health::{CircuitState, FailureKind, HealthSnapshot};
pub use offer::{Fingerprint, Offer, Price, Segment};
pub use query::{CabinClass, PassengerCount, Query, QueryKey, QueryMode, TripType};
pub use source::{CredentialsKind, SourceId, SourceTier, SourceVariant};
