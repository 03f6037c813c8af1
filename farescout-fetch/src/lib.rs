// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Farescout Fetch
//!
//! Fetch infrastructure shared by all Farescout adapters.
//!
//! This crate provides the building blocks adapters use to talk to
//! upstream sources without owning any source-specific logic:
//!
//! - [`context::AdapterContext`] - host APIs injected by the executor
//!   (no process-wide singletons)
//! - [`deadline::Deadline`] - monotonic per-request deadline
//! - [`client::HttpClient`] - HTTP client with browser impersonation
//!   profiles and pre-seeded consent cookies
//! - [`ratelimit::TokenBucket`] - per-source token bucket with
//!   deadline-bounded waits and cancellation-safe permits
//! - [`evasion`] - explicit anti-bot strategy ladder, advanced on
//!   classified challenges and observable for testing
//! - [`oauth::TokenCache`] - OAuth2 client-credentials token lifecycle
//!   with early refresh
//! - [`browser::BrowserPool`] - fixed-size pool of long-lived headless
//!   browser instances with scoped leases
//! - [`proxy::ProxyPool`] - residential proxy leases with rotation

pub mod browser;
pub mod client;
pub mod context;
pub mod deadline;
pub mod error;
pub mod evasion;
pub mod oauth;
pub mod proxy;
pub mod ratelimit;
pub mod retry;

// Errors
pub use error::{BrowserError, FetchError, OauthError};

// Infrastructure
pub use browser::{BrowserLease, BrowserPool};
pub use client::{HttpClient, ImpersonateProfile, RequestShape, ResponseExt};
pub use context::{AdapterContext, AdapterContextBuilder, FetchSettings};
pub use deadline::Deadline;
pub use evasion::{EvasionLadder, EvasionState, EvasionStrategy};
pub use oauth::{OauthConfig, TokenCache};
pub use proxy::{ProxyLease, ProxyPool};
pub use ratelimit::{BucketConfig, Permit, TokenBucket};
pub use retry::RetryStrategy;
