//! Eastar Jet adapter.
//!
//! The booking engine requires an anonymous session established by a
//! warm-up GET before any availability call, plus the web client's
//! channel-code header. The session token is cached across requests and
//! dropped on a 401, so the executor's single auth retry re-warms it.

pub(crate) mod normalize;
pub mod parser;

use async_trait::async_trait;
use farescout_core::{CredentialsKind, Query, SourceId, SourceVariant};
use farescout_fetch::{
    AdapterContext, BucketConfig, Deadline, EvasionLadder, EvasionStrategy, FetchError,
    ImpersonateProfile, RequestShape, ResponseExt,
};
use reqwest::header::{HeaderName, HeaderValue, ORIGIN, REFERER};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::adapter::Adapter;
use crate::descriptor::{SourceCredentials, SourceDescriptor};
use crate::manifest;
use crate::raw::{RawOffer, RawPayload};

pub use parser::{EastarFare, EastarJourney, EastarSegment};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    session_token: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

// ============================================================================
// Adapter
// ============================================================================

/// Eastar Jet availability adapter.
#[derive(Debug, Default)]
pub struct EastarAdapter {
    session: Mutex<Option<String>>,
}

impl EastarAdapter {
    /// Creates the adapter.
    pub fn new() -> Self {
        Self::default()
    }

    fn base_shape(deadline: Deadline) -> Result<RequestShape, FetchError> {
        Ok(RequestShape::impersonating(ImpersonateProfile::Chrome131)
            .with_header(ORIGIN, HeaderValue::from_static(manifest::eastar::WEB_ORIGIN))
            .with_header(
                REFERER,
                HeaderValue::from_static(manifest::eastar::WEB_ORIGIN),
            )
            .with_header(
                HeaderName::from_static("x-channel-code"),
                HeaderValue::from_static(manifest::eastar::CHANNEL_CODE),
            )
            .with_timeout(deadline.checked_remaining()?))
    }

    /// Warm-up GET creating an anonymous session; cached until a 401.
    async fn ensure_session(
        &self,
        ctx: &AdapterContext,
        deadline: Deadline,
    ) -> Result<String, FetchError> {
        let mut session = self.session.lock().await;
        if let Some(token) = session.as_ref() {
            return Ok(token.clone());
        }

        let url = format!(
            "{}{}",
            manifest::eastar::API_ORIGIN,
            manifest::eastar::SESSION_PATH
        );
        let shape = Self::base_shape(deadline)?;
        let response = ctx.http.get(&url, &[], &shape).await?.check_status()?;
        let body: SessionResponse = response.json().await?;
        let token = body
            .session_token
            .or(body.token)
            .ok_or_else(|| FetchError::Unusable("session response has no token".to_string()))?;
        debug!("Anonymous session created");
        *session = Some(token.clone());
        Ok(token)
    }

    async fn drop_session(&self) {
        self.session.lock().await.take();
    }
}

#[async_trait]
impl Adapter for EastarAdapter {
    fn id(&self) -> SourceId {
        SourceId::Eastar
    }

    #[instrument(skip(self, query, ctx), fields(source = "eastar"))]
    async fn search(
        &self,
        query: &Query,
        ctx: &AdapterContext,
        deadline: Deadline,
        _evasion: EvasionStrategy,
    ) -> Result<Vec<RawOffer>, FetchError> {
        let token = self.ensure_session(ctx, deadline).await?;

        let url = format!(
            "{}{}",
            manifest::eastar::API_ORIGIN,
            manifest::eastar::AVAIL_PATH
        );
        let token_value = HeaderValue::from_str(&token)
            .map_err(|_| FetchError::AuthFailed("session token is not header-safe".to_string()))?;
        let shape = Self::base_shape(deadline)?.with_header(
            HeaderName::from_static(manifest::eastar::SESSION_HEADER),
            token_value,
        );
        let body = json!({
            "origin": query.origin,
            "destination": query.destination,
            "departureDate": query.departure_date,
            "adults": query.passengers.adults,
            "children": query.passengers.children,
            "infants": query.passengers.infants_in_seat + query.passengers.infants_on_lap,
            "currency": query.currency,
        });

        let response = ctx.http.post_json(&url, &body, &shape).await?;
        if response.status().as_u16() == 401 {
            // Session expired server-side; the executor's auth retry
            // will re-warm a fresh one.
            self.drop_session().await;
            return Err(FetchError::AuthExpired("session rejected".to_string()));
        }
        let response = response.check_status()?;
        let text = response.text().await?;

        let journeys = parser::parse_availability(&text)?;
        Ok(journeys
            .into_iter()
            .map(|journey| RawOffer::new(SourceId::Eastar, RawPayload::Eastar(journey)))
            .collect())
    }

    async fn health_check(&self, ctx: &AdapterContext) -> bool {
        let deadline = Deadline::after(Duration::from_secs(10));
        self.ensure_session(ctx, deadline).await.is_ok()
    }
}

// ============================================================================
// Descriptor
// ============================================================================

/// Descriptor for the Eastar source.
pub fn eastar_descriptor() -> SourceDescriptor {
    SourceDescriptor {
        id: SourceId::Eastar,
        variant: SourceVariant::PerAirlineReverse,
        credentials: CredentialsKind::None,
        rate_limit: BucketConfig::new(3.0, 0.5),
        timeout: Duration::from_secs(30),
        deadline_floor: Duration::from_millis(500),
        evasion: || {
            EvasionLadder::new(vec![
                EvasionStrategy::ImpersonateWarm(ImpersonateProfile::Chrome131),
                EvasionStrategy::ImpersonateProxy(ImpersonateProfile::Chrome131),
            ])
        },
        carriers: &["ZE"],
        build: |_creds: &SourceCredentials| Arc::new(EastarAdapter::new()),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_cache_starts_empty() {
        let adapter = EastarAdapter::new();
        assert!(adapter.session.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_drop_session_clears_cache() {
        let adapter = EastarAdapter::new();
        *adapter.session.lock().await = Some("tok".to_string());
        adapter.drop_session().await;
        assert!(adapter.session.lock().await.is_none());
    }
}
