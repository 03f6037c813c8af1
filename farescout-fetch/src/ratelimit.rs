//! Per-source token buckets.
//!
//! A bucket is consumed before the network call. When empty, the caller
//! waits up to the smaller of the refill wait and the request deadline,
//! then fails `RATE_LIMITED`. Permits are cancellation-safe: a permit
//! dropped without [`Permit::commit`] refunds its token, so a cancelled
//! request never leaks bucket capacity.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::deadline::Deadline;
use crate::error::FetchError;

// ============================================================================
// Bucket Config
// ============================================================================

/// Static configuration for one token bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Maximum tokens the bucket holds.
    pub capacity: f64,
    /// Tokens added per second.
    pub refill_per_sec: f64,
}

impl BucketConfig {
    /// Creates a config with the given capacity and refill rate.
    pub fn new(capacity: f64, refill_per_sec: f64) -> Self {
        Self {
            capacity,
            refill_per_sec,
        }
    }
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            capacity: 5.0,
            refill_per_sec: 1.0,
        }
    }
}

// ============================================================================
// Token Bucket
// ============================================================================

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

#[derive(Debug)]
struct BucketInner {
    config: BucketConfig,
    state: Mutex<BucketState>,
}

impl BucketInner {
    /// Applies elapsed-time refill and returns the current token count.
    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.config.refill_per_sec)
            .min(self.config.capacity);
        state.last_refill = now;
    }

    fn refund(&self) {
        let mut state = self.state.lock().expect("bucket lock poisoned");
        self.refill(&mut state);
        state.tokens = (state.tokens + 1.0).min(self.config.capacity);
    }
}

/// Token bucket rate limiter for one source.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    inner: Arc<BucketInner>,
}

impl TokenBucket {
    /// Creates a full bucket with the given configuration.
    pub fn new(config: BucketConfig) -> Self {
        Self {
            inner: Arc::new(BucketInner {
                config,
                state: Mutex::new(BucketState {
                    tokens: config.capacity,
                    last_refill: Instant::now(),
                }),
            }),
        }
    }

    /// Approximate tokens currently available.
    pub fn remaining(&self) -> f64 {
        let mut state = self.inner.state.lock().expect("bucket lock poisoned");
        self.inner.refill(&mut state);
        state.tokens
    }

    /// Tries to take one token without waiting.
    pub fn try_acquire(&self) -> Option<Permit> {
        let mut state = self.inner.state.lock().expect("bucket lock poisoned");
        self.inner.refill(&mut state);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            Some(Permit::new(Arc::clone(&self.inner)))
        } else {
            None
        }
    }

    /// Takes one token, waiting up to the deadline for refill.
    ///
    /// Fails `RATE_LIMITED` when the bucket cannot produce a token before
    /// the deadline; the wait itself is a cancellation suspension point.
    pub async fn acquire(&self, deadline: Deadline) -> Result<Permit, FetchError> {
        loop {
            let wait = {
                let mut state = self.inner.state.lock().expect("bucket lock poisoned");
                self.inner.refill(&mut state);
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return Ok(Permit::new(Arc::clone(&self.inner)));
                }
                let deficit = 1.0 - state.tokens;
                Duration::from_secs_f64(deficit / self.inner.config.refill_per_sec)
            };

            let remaining = deadline.remaining();
            if wait > remaining {
                trace!(?wait, ?remaining, "bucket wait exceeds deadline");
                return Err(FetchError::RateLimited {
                    retry_after: Some(wait.as_secs().max(1)),
                });
            }
            tokio::time::sleep(wait).await;
        }
    }
}

// ============================================================================
// Permit
// ============================================================================

/// One consumed token.
///
/// Call [`commit`](Self::commit) once the network call has been issued;
/// dropping an uncommitted permit (cancellation before send) refunds the
/// token.
#[derive(Debug)]
pub struct Permit {
    bucket: Option<Arc<BucketInner>>,
}

impl Permit {
    fn new(bucket: Arc<BucketInner>) -> Self {
        Self {
            bucket: Some(bucket),
        }
    }

    /// Marks the token as spent; no refund on drop.
    pub fn commit(mut self) {
        self.bucket = None;
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        if let Some(bucket) = self.bucket.take() {
            bucket.refund();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
