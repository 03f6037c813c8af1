//! GDS adapter.
//!
//! Talks to the Amadeus self-service flight-offers API over OAuth2
//! client-credentials. Tokens are cached and refreshed 60 seconds early;
//! a 401 invalidates the cache so the executor's single auth retry runs
//! with a fresh token. The free tier allows 5 req/s and 1000 req/h; the
//! hourly budget is enforced here on top of the source bucket.

pub(crate) mod normalize;
pub mod parser;

use async_trait::async_trait;
use farescout_core::{CabinClass, CredentialsKind, Query, SourceId, SourceVariant};
use farescout_fetch::{
    AdapterContext, BucketConfig, Deadline, EvasionLadder, EvasionStrategy, FetchError,
    OauthConfig, RequestShape, ResponseExt, TokenBucket, TokenCache,
};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::adapter::Adapter;
use crate::descriptor::{SourceCredentials, SourceDescriptor};
use crate::manifest;
use crate::raw::{RawOffer, RawPayload};

pub use parser::{AmadeusOffer, AmadeusSegment};

fn travel_class(cabin: CabinClass) -> &'static str {
    cabin.as_str()
}

// ============================================================================
// Adapter
// ============================================================================

/// GDS flight-offers adapter.
pub struct AmadeusAdapter {
    tokens: TokenCache,
    hourly: TokenBucket,
}

impl AmadeusAdapter {
    /// Creates the adapter from OAuth2 credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        let config = OauthConfig {
            label: "amadeus".to_string(),
            token_url: manifest::amadeus::TOKEN_URL.to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        };
        #[allow(clippy::cast_precision_loss)]
        let hourly = TokenBucket::new(BucketConfig::new(
            f64::from(manifest::amadeus::HOURLY_CAP),
            f64::from(manifest::amadeus::HOURLY_CAP) / 3600.0,
        ));
        Self {
            tokens: TokenCache::new(config),
            hourly,
        }
    }
}

#[async_trait]
impl Adapter for AmadeusAdapter {
    fn id(&self) -> SourceId {
        SourceId::Amadeus
    }

    #[instrument(skip(self, query, ctx), fields(source = "amadeus"))]
    async fn search(
        &self,
        query: &Query,
        ctx: &AdapterContext,
        deadline: Deadline,
        _evasion: EvasionStrategy,
    ) -> Result<Vec<RawOffer>, FetchError> {
        // Hourly budget on top of the per-second source bucket.
        let permit = self
            .hourly
            .try_acquire()
            .ok_or(FetchError::RateLimited { retry_after: None })?;

        let token = self.tokens.token(&ctx.http).await?;
        let auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| FetchError::AuthFailed("token is not header-safe".to_string()))?;
        let shape = RequestShape::plain()
            .with_header(AUTHORIZATION, auth)
            .with_timeout(deadline.checked_remaining()?);

        let date = query.departure_date.to_string();
        let adults = query.passengers.adults.to_string();
        let params: Vec<(&str, &str)> = vec![
            ("originLocationCode", query.origin.as_str()),
            ("destinationLocationCode", query.destination.as_str()),
            ("departureDate", date.as_str()),
            ("adults", adults.as_str()),
            ("travelClass", travel_class(query.cabin)),
            ("currencyCode", query.currency.as_str()),
            ("max", "50"),
        ];

        let response = ctx
            .http
            .get(manifest::amadeus::OFFERS_URL, &params, &shape)
            .await?;
        permit.commit();

        if response.status().as_u16() == 401 {
            self.tokens.invalidate().await;
            return Err(FetchError::AuthExpired("bearer rejected".to_string()));
        }
        let response = response.check_status()?;
        let body = response.text().await?;

        let offers = parser::parse_flight_offers(&body)?;
        Ok(offers
            .into_iter()
            .map(|offer| RawOffer::new(SourceId::Amadeus, RawPayload::Amadeus(offer)))
            .collect())
    }

    async fn health_check(&self, ctx: &AdapterContext) -> bool {
        self.tokens.is_configured() && self.tokens.token(&ctx.http).await.is_ok()
    }
}

// ============================================================================
// Descriptor
// ============================================================================

/// Descriptor for the GDS source.
pub fn amadeus_descriptor() -> SourceDescriptor {
    SourceDescriptor {
        id: SourceId::Amadeus,
        variant: SourceVariant::GdsSdk,
        credentials: CredentialsKind::Oauth,
        rate_limit: BucketConfig::new(5.0, 5.0),
        timeout: Duration::from_secs(30),
        deadline_floor: Duration::from_millis(500),
        evasion: || EvasionLadder::single(EvasionStrategy::Direct),
        carriers: &[],
        build: |creds: &SourceCredentials| {
            Arc::new(AmadeusAdapter::new(
                creds.client_id.clone().unwrap_or_default(),
                creds.client_secret.clone().unwrap_or_default(),
            ))
        },
    }
}

// ============================================================================
// Tests
// ============================================================================
