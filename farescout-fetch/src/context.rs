//! Adapter context.
//!
//! The context bundles every host facility an adapter may touch: the
//! shared HTTP client, the browser pool, the proxy pool, and fetch
//! settings. It is owned by the executor and injected into adapters;
//! there are no process-wide singletons.

use std::sync::Arc;
use std::time::Duration;

use crate::browser::BrowserPool;
use crate::client::HttpClient;
use crate::proxy::ProxyPool;

// ============================================================================
// Fetch Settings
// ============================================================================

/// Cross-adapter fetch settings.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Default per-request HTTP timeout when no deadline clamp applies.
    pub http_timeout: Duration,
    /// Grace period a cancelled task gets to release its resources.
    pub cancel_grace: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(30),
            cancel_grace: Duration::from_secs(2),
        }
    }
}

// ============================================================================
// Adapter Context
// ============================================================================

/// Host facilities injected into every adapter call.
pub struct AdapterContext {
    /// Shared HTTP client.
    pub http: Arc<HttpClient>,
    /// Browser pool for automation sources.
    pub browser: Arc<BrowserPool>,
    /// Residential proxy pool.
    pub proxy: Arc<ProxyPool>,
    /// Fetch settings.
    pub settings: FetchSettings,
}

impl AdapterContext {
    /// Creates a context with default facilities and no browser/proxy
    /// capacity. Useful for tests and API-only deployments.
    pub fn minimal() -> Self {
        Self {
            http: Arc::new(HttpClient::new()),
            browser: Arc::new(BrowserPool::disabled()),
            proxy: Arc::new(ProxyPool::disabled()),
            settings: FetchSettings::default(),
        }
    }

    /// Creates a builder.
    pub fn builder() -> AdapterContextBuilder {
        AdapterContextBuilder::new()
    }
}

impl std::fmt::Debug for AdapterContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterContext")
            .field("settings", &self.settings)
            .field("browser_slots", &self.browser.size())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`AdapterContext`].
pub struct AdapterContextBuilder {
    http: Option<Arc<HttpClient>>,
    browser: Option<Arc<BrowserPool>>,
    proxy: Option<Arc<ProxyPool>>,
    settings: FetchSettings,
}

impl AdapterContextBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            http: None,
            browser: None,
            proxy: None,
            settings: FetchSettings::default(),
        }
    }

    /// Sets the HTTP client.
    pub fn http(mut self, http: Arc<HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Sets the browser pool.
    pub fn browser(mut self, browser: Arc<BrowserPool>) -> Self {
        self.browser = Some(browser);
        self
    }

    /// Sets the proxy pool.
    pub fn proxy(mut self, proxy: Arc<ProxyPool>) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Sets the fetch settings.
    pub fn settings(mut self, settings: FetchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Builds the context, defaulting any facility not provided.
    pub fn build(self) -> AdapterContext {
        AdapterContext {
            http: self.http.unwrap_or_else(|| Arc::new(HttpClient::new())),
            browser: self
                .browser
                .unwrap_or_else(|| Arc::new(BrowserPool::disabled())),
            proxy: self.proxy.unwrap_or_else(|| Arc::new(ProxyPool::disabled())),
            settings: self.settings,
        }
    }
}

impl Default for AdapterContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_context() {
        let ctx = AdapterContext::minimal();
        assert_eq!(ctx.browser.size(), 0);
        assert!(!ctx.proxy.is_enabled());
    }

    #[test]
    fn test_builder_defaults() {
        let ctx = AdapterContext::builder()
            .settings(FetchSettings {
                http_timeout: Duration::from_secs(5),
                cancel_grace: Duration::from_secs(1),
            })
            .build();
        assert_eq!(ctx.settings.http_timeout, Duration::from_secs(5));
    }
}
