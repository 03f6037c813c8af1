// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Farescout Engine
//!
//! The orchestration core: decides which sources answer a query, fans
//! calls out in parallel under deadlines and rate limits, folds the
//! results into one deduplicated offer list, and serves everything
//! through a stale-while-revalidate cache.
//!
//! - [`health::HealthRegistry`] - per-source rolling health, circuit
//!   breakers, evasion ladders, token buckets (single writer: executor)
//! - [`router::Router`] - coverage-table routing into primary /
//!   complementary / fallback tiers
//! - [`executor::FanOutExecutor`] - parallel invocation with
//!   first-response-wins, background continuation, and cancellation
//! - [`merger`] - fingerprint dedup and best-price selection
//! - [`service::SearchService`] - the downstream-facing facade
//! - [`refresh::RefreshScheduler`] - periodic background refresh of
//!   popular routes

pub mod bootstrap;
pub mod error;
pub mod executor;
pub mod health;
pub mod merger;
pub mod refresh;
pub mod router;
pub mod service;

pub use bootstrap::bootstrap;
pub use error::EngineError;
pub use executor::{CrawlSummary, FanOutExecutor, FanOutOutcome};
pub use health::HealthRegistry;
pub use refresh::{RefreshConfig, RefreshScheduler};
pub use router::{RoutePlan, Router};
pub use service::{SearchResponse, SearchService};
