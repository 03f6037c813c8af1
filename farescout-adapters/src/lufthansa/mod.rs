//! Group open-API adapter.
//!
//! Official API over OAuth2 client-credentials covering eight group
//! carriers. Tokens live for hours and are cached with an early refresh;
//! a 401 invalidates the cache and surfaces as `AUTH_EXPIRED` so the
//! executor retries once with a fresh token.

pub(crate) mod normalize;
pub mod parser;

use async_trait::async_trait;
use farescout_core::{CredentialsKind, Query, SourceId, SourceVariant};
use farescout_fetch::{
    AdapterContext, BucketConfig, Deadline, EvasionLadder, EvasionStrategy, FetchError,
    OauthConfig, RequestShape, ResponseExt, TokenCache,
};
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::adapter::Adapter;
use crate::descriptor::{SourceCredentials, SourceDescriptor};
use crate::manifest;
use crate::raw::{RawOffer, RawPayload};

pub use parser::LhFare;

/// Best-fares endpoint next to the schedules API.
const BEST_FARES_URL: &str = "https://api.lufthansa.com/v1/offers/fares/best";

// ============================================================================
// Adapter
// ============================================================================

/// Group open-API adapter.
pub struct LufthansaAdapter {
    tokens: TokenCache,
}

impl LufthansaAdapter {
    /// Creates the adapter from OAuth2 credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        let config = OauthConfig {
            label: "lufthansa".to_string(),
            token_url: manifest::lufthansa::TOKEN_URL.to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        };
        Self {
            tokens: TokenCache::new(config),
        }
    }

    async fn shape(
        &self,
        ctx: &AdapterContext,
        deadline: Deadline,
    ) -> Result<RequestShape, FetchError> {
        let token = self.tokens.token(&ctx.http).await?;
        let auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| FetchError::AuthFailed("token is not header-safe".to_string()))?;
        Ok(RequestShape::plain()
            .with_header(AUTHORIZATION, auth)
            .with_header(ACCEPT, HeaderValue::from_static("application/json"))
            .with_timeout(deadline.checked_remaining()?))
    }
}

#[async_trait]
impl Adapter for LufthansaAdapter {
    fn id(&self) -> SourceId {
        SourceId::Lufthansa
    }

    #[instrument(skip(self, query, ctx), fields(source = "lufthansa"))]
    async fn search(
        &self,
        query: &Query,
        ctx: &AdapterContext,
        deadline: Deadline,
        _evasion: EvasionStrategy,
    ) -> Result<Vec<RawOffer>, FetchError> {
        let shape = self.shape(ctx, deadline).await?;

        let date = query.departure_date.to_string();
        let params: Vec<(&str, &str)> = vec![
            ("origin", query.origin.as_str()),
            ("destination", query.destination.as_str()),
            ("travelDate", date.as_str()),
            ("cabinClass", query.cabin.as_str()),
            ("fareFamily", "all"),
        ];

        let response = ctx.http.get(BEST_FARES_URL, &params, &shape).await?;
        if response.status().as_u16() == 401 {
            self.tokens.invalidate().await;
            return Err(FetchError::AuthExpired("bearer rejected".to_string()));
        }
        let response = response.check_status()?;
        let body = response.text().await?;

        let fares = parser::parse_best_fares(&body)?;
        Ok(fares
            .into_iter()
            .map(|fare| RawOffer::new(SourceId::Lufthansa, RawPayload::Lufthansa(fare)))
            .collect())
    }

    async fn health_check(&self, ctx: &AdapterContext) -> bool {
        // Obtaining a token exercises credentials and reachability; the
        // schedules endpoint stays untouched on probes.
        self.tokens.is_configured() && self.tokens.token(&ctx.http).await.is_ok()
    }
}

// ============================================================================
// Descriptor
// ============================================================================

/// Descriptor for the group open-API source.
pub fn lufthansa_descriptor() -> SourceDescriptor {
    SourceDescriptor {
        id: SourceId::Lufthansa,
        variant: SourceVariant::OfficialApi,
        credentials: CredentialsKind::Oauth,
        rate_limit: BucketConfig::new(5.0, 1.0),
        timeout: Duration::from_secs(30),
        deadline_floor: Duration::from_millis(500),
        evasion: || EvasionLadder::single(EvasionStrategy::Direct),
        carriers: manifest::lufthansa::GROUP_AIRLINES,
        build: |creds: &SourceCredentials| {
            Arc::new(LufthansaAdapter::new(
                creds.client_id.clone().unwrap_or_default(),
                creds.client_secret.clone().unwrap_or_default(),
            ))
        },
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_health_fails() {
        let adapter = LufthansaAdapter::new("", "");
        let ctx = AdapterContext::minimal();
        assert!(!adapter.health_check(&ctx).await);
    }

    #[test]
    fn test_descriptor_covers_group_carriers() {
        let desc = lufthansa_descriptor();
        assert!(desc.serves_carrier("LH"));
        assert!(desc.serves_carrier("LX"));
        assert!(!desc.serves_carrier("KE"));
    }
}
