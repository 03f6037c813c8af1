//! Residential proxy pool.
//!
//! Proxies are leased per request, only for browser automation and
//! classified-challenge retries. Each lease rotates to the next address;
//! a semaphore bounds concurrent leases.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::deadline::Deadline;
use crate::error::FetchError;

// ============================================================================
// Proxy Pool
// ============================================================================

/// Rotating pool of residential proxy endpoints.
#[derive(Debug, Clone)]
pub struct ProxyPool {
    endpoints: Arc<Vec<String>>,
    cursor: Arc<AtomicUsize>,
    slots: Arc<Semaphore>,
}

impl ProxyPool {
    /// Creates a pool over the given endpoints.
    ///
    /// `max_concurrent` bounds simultaneous leases across all sources.
    pub fn new(endpoints: Vec<String>, max_concurrent: usize) -> Self {
        Self {
            endpoints: Arc::new(endpoints),
            cursor: Arc::new(AtomicUsize::new(0)),
            slots: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// An empty pool; leases always fail.
    pub fn disabled() -> Self {
        Self::new(Vec::new(), 1)
    }

    /// Whether any endpoints are configured.
    pub fn is_enabled(&self) -> bool {
        !self.endpoints.is_empty()
    }

    /// Leases the next proxy in rotation, waiting up to the deadline for
    /// a free slot.
    pub async fn lease(&self, deadline: Deadline) -> Result<ProxyLease, FetchError> {
        if self.endpoints.is_empty() {
            return Err(FetchError::RateLimited { retry_after: None });
        }
        let permit = tokio::time::timeout(
            deadline.remaining(),
            Arc::clone(&self.slots).acquire_owned(),
        )
        .await
        .map_err(|_| FetchError::DeadlineExceeded)?
        .map_err(|_| FetchError::Cancelled)?;

        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.endpoints.len();
        let url = self.endpoints[idx].clone();
        debug!(proxy = idx, "Proxy leased");
        Ok(ProxyLease {
            url,
            _permit: permit,
        })
    }
}

// ============================================================================
// Proxy Lease
// ============================================================================

/// One leased proxy endpoint; the slot frees on drop.
#[derive(Debug)]
pub struct ProxyLease {
    url: String,
    _permit: OwnedSemaphorePermit,
}

impl ProxyLease {
    /// The proxy URL for this lease.
    pub fn url(&self) -> &str {
        &self.url
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_rotation() {
        let pool = ProxyPool::new(
            vec!["http://p1:8080".to_string(), "http://p2:8080".to_string()],
            4,
        );
        let deadline = Deadline::after(Duration::from_secs(1));
        let a = pool.lease(deadline).await.unwrap();
        let b = pool.lease(deadline).await.unwrap();
        assert_ne!(a.url(), b.url());
    }

    #[tokio::test]
    async fn test_disabled_pool_fails() {
        let pool = ProxyPool::disabled();
        let deadline = Deadline::after(Duration::from_millis(10));
        assert!(pool.lease(deadline).await.is_err());
    }

    #[tokio::test]
    async fn test_slot_bound() {
        let pool = ProxyPool::new(vec!["http://p1:8080".to_string()], 1);
        let deadline = Deadline::after(Duration::from_millis(50));
        let held = pool.lease(deadline).await.unwrap();

        // Second lease times out while the slot is held.
        let err = pool.lease(Deadline::after(Duration::from_millis(20))).await;
        assert!(err.is_err());
        drop(held);

        // Slot is free again.
        assert!(pool
            .lease(Deadline::after(Duration::from_millis(100)))
            .await
            .is_ok());
    }
}
