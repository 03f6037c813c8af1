// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Farescout Store
//!
//! State management for the Farescout engine:
//!
//! - [`cache::OfferCache`] - stale-while-revalidate offer cache with
//!   atomic entry swaps and per-key refresh dedup
//! - [`tiers`] - route popularity tiers and their TTLs
//! - [`history::PriceHistory`] - append-only price history and search
//!   log over SQLite
//! - [`config::Config`] - typed configuration, JSON on disk

pub mod cache;
pub mod config;
pub mod error;
pub mod history;
pub mod tiers;

pub use cache::{CacheEntry, CacheState, OfferCache};
pub use config::{AdapterConfig, Config, TierOverride};
pub use error::StoreError;
pub use history::{HistoryRow, PriceHistory};
pub use tiers::{RouteTier, TierTtls};
