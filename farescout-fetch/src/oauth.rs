//! OAuth2 client-credentials token lifecycle.
//!
//! Tokens are cached in memory and refreshed 60 seconds before their
//! stated expiry. A 401 downstream invalidates the cache so the caller's
//! single retry fetches a fresh token.

use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::client::{HttpClient, RequestShape};
use crate::error::OauthError;

/// Tokens are refreshed this long before their stated expiry.
const EARLY_REFRESH: Duration = Duration::from_secs(60);

// ============================================================================
// OAuth Config
// ============================================================================

/// Static OAuth2 client-credentials configuration for one source.
#[derive(Debug, Clone)]
pub struct OauthConfig {
    /// Source label for error messages.
    pub label: String,
    /// Token endpoint URL.
    pub token_url: String,
    /// Client id.
    pub client_id: String,
    /// Client secret.
    pub client_secret: String,
}

impl OauthConfig {
    /// Whether both credentials are present.
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

// ============================================================================
// Token Response
// ============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    21_600
}

// ============================================================================
// Token Cache
// ============================================================================

#[derive(Debug)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// In-memory OAuth2 token cache for one source.
#[derive(Debug)]
pub struct TokenCache {
    config: OauthConfig,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    /// Creates an empty cache for the given configuration.
    pub fn new(config: OauthConfig) -> Self {
        Self {
            config,
            cached: Mutex::new(None),
        }
    }

    /// Whether credentials are configured at all.
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Returns a valid access token, fetching or refreshing as needed.
    pub async fn token(&self, http: &HttpClient) -> Result<String, OauthError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.access_token.clone());
            }
            debug!(source = %self.config.label, "Cached token expired");
        }

        let fresh = self.fetch_token(http).await?;
        let access = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access)
    }

    /// Drops the cached token; the next call fetches a fresh one.
    ///
    /// Used by the 401-refresh-once-retry-once policy.
    pub async fn invalidate(&self) {
        self.cached.lock().await.take();
    }

    async fn fetch_token(&self, http: &HttpClient) -> Result<CachedToken, OauthError> {
        if !self.config.is_configured() {
            return Err(OauthError::NotConfigured(self.config.label.clone()));
        }

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        let response = http
            .post_form(&self.config.token_url, &form, &RequestShape::plain())
            .await
            .map_err(|e| match e {
                crate::error::FetchError::Http(err) => OauthError::Transport(err),
                other => OauthError::Malformed(other.to_string()),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(OauthError::Rejected(status.as_u16()));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| OauthError::Malformed(e.to_string()))?;

        info!(
            source = %self.config.label,
            expires_in = body.expires_in,
            "OAuth2 token acquired"
        );

        let lifetime = Duration::from_secs(body.expires_in).saturating_sub(EARLY_REFRESH);
        Ok(CachedToken {
            access_token: body.access_token,
            expires_at: Instant::now() + lifetime,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn config(id: &str, secret: &str) -> OauthConfig {
        OauthConfig {
            label: "test".to_string(),
            token_url: "https://auth.example.com/oauth/token".to_string(),
            client_id: id.to_string(),
            client_secret: secret.to_string(),
        }
    }

    #[test]
    fn test_is_configured() {
        assert!(config("id", "secret").is_configured());
        assert!(!config("", "secret").is_configured());
        assert!(!config("id", "").is_configured());
    }

    #[tokio::test]
    async fn test_unconfigured_cache_errors() {
        let cache = TokenCache::new(config("", ""));
        let http = HttpClient::new();
        let err = cache.token(&http).await.unwrap_err();
        assert!(matches!(err, OauthError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_invalidate_clears_cache() {
        let cache = TokenCache::new(config("id", "secret"));
        {
            let mut cached = cache.cached.lock().await;
            *cached = Some(CachedToken {
                access_token: "tok".to_string(),
                expires_at: Instant::now() + Duration::from_secs(600),
            });
        }
        cache.invalidate().await;
        assert!(cache.cached.lock().await.is_none());
    }
}
