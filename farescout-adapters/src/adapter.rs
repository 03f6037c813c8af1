//! The adapter contract.
//!
//! Every upstream implementation satisfies this trait: the executor
//! decides *when* and *how hard* (deadline, evasion rung), the adapter
//! decides *what bytes to move* and *what they mean*.

use async_trait::async_trait;
use farescout_core::{FailureKind, Query, SourceId};
use farescout_fetch::{AdapterContext, Deadline, EvasionStrategy, FetchError};
use std::time::Duration;

use crate::raw::RawOffer;

/// Contract every upstream source implementation satisfies.
///
/// `search` emits the source's raw offers for one query; the executor
/// fans calls out in parallel and the normalizer folds the payloads into
/// canonical offers. Implementations must observe the deadline at every
/// I/O suspension point and must not retry internally; retry, backoff,
/// and evasion escalation are executor policy, driven by
/// [`classify_failure`](Adapter::classify_failure).
#[async_trait]
pub trait Adapter: Send + Sync {
    /// The source this adapter serves.
    fn id(&self) -> SourceId;

    /// Minimum remaining budget required to bother starting a call.
    ///
    /// Below this floor the executor skips the source outright instead
    /// of starting work it would immediately cancel.
    fn deadline_floor(&self) -> Duration {
        Duration::from_millis(500)
    }

    /// Executes one search under the given deadline and evasion rung.
    async fn search(
        &self,
        query: &Query,
        ctx: &AdapterContext,
        deadline: Deadline,
        evasion: EvasionStrategy,
    ) -> Result<Vec<RawOffer>, FetchError>;

    /// Cheap reachability probe for circuit-breaker re-checks.
    async fn health_check(&self, ctx: &AdapterContext) -> bool;

    /// Classifies a failure for retry/backoff/health policy.
    ///
    /// The default defers to the error's own classification; adapters
    /// override it when a source signals challenges in-band (200 with a
    /// challenge body, vendor error codes).
    fn classify_failure(&self, error: &FetchError) -> FailureKind {
        error.classify()
    }
}
