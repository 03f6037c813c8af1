//! Binary metasearch adapter.
//!
//! The richest single source: near-global coverage through a single
//! endpoint that takes a base64-encoded binary query. The page embeds
//! results as a JS data blob; pricing rides as a nested base64 summary.
//!
//! The endpoint sits behind consent and traffic-shape checks, so requests
//! go out on an impersonating profile with consent cookies pre-seeded,
//! escalating through a proxied profile up to a full browser session.

pub(crate) mod normalize;
pub mod parser;
pub mod wire;

use async_trait::async_trait;
use farescout_core::{Query, SourceId, SourceVariant};
use farescout_fetch::{
    AdapterContext, BucketConfig, Deadline, EvasionLadder, EvasionStrategy, FetchError,
    ImpersonateProfile, RequestShape, ResponseExt,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::adapter::Adapter;
use crate::descriptor::{SourceCredentials, SourceDescriptor};
use crate::evasion_shape;
use crate::manifest;
use crate::raw::{RawOffer, RawPayload};

pub use parser::{GoogleItinerary, GoogleSegment};
pub use wire::TfsQuery;

// ============================================================================
// Adapter
// ============================================================================

/// Metasearch adapter.
#[derive(Debug, Default)]
pub struct GoogleAdapter;

impl GoogleAdapter {
    /// Creates the adapter.
    pub fn new() -> Self {
        Self
    }

    fn page_url(query: &Query) -> (String, [(String, String); 4]) {
        let tfs = TfsQuery::from_query(query).as_b64();
        let params = [
            ("tfs".to_string(), tfs),
            ("hl".to_string(), "en".to_string()),
            ("tfu".to_string(), manifest::google::TFU.to_string()),
            ("curr".to_string(), query.currency.clone()),
        ];
        (manifest::google::FLIGHTS_URL.to_string(), params)
    }

    async fn fetch_via_http(
        &self,
        query: &Query,
        ctx: &AdapterContext,
        deadline: Deadline,
        evasion: EvasionStrategy,
    ) -> Result<String, FetchError> {
        let (url, params) = Self::page_url(query);
        let profile = evasion
            .profile()
            .unwrap_or(ImpersonateProfile::Chrome126);
        let shape = RequestShape::impersonating(profile)
            .with_cookies(manifest::google::CONSENT_COOKIE)
            .with_timeout(deadline.checked_remaining()?);
        let (shape, _proxy_guard) = evasion_shape::apply(shape, ctx, evasion, deadline).await?;

        let param_refs: Vec<(&str, &str)> = params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let response = ctx.http.get(&url, &param_refs, &shape).await?.check_status()?;
        Ok(response.text().await?)
    }

    async fn fetch_via_browser(
        &self,
        query: &Query,
        ctx: &AdapterContext,
        deadline: Deadline,
    ) -> Result<String, FetchError> {
        let (url, params) = Self::page_url(query);
        let full_url = format!(
            "{url}?{}",
            params
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("&")
        );

        let lease = ctx.browser.lease(deadline).await?;
        let page = lease.new_page(&full_url).await?;
        let html = page
            .content()
            .await
            .map_err(|e| farescout_fetch::BrowserError::EvaluationFailed(e.to_string()))?;
        let _ = page.close().await;
        Ok(html)
    }
}

#[async_trait]
impl Adapter for GoogleAdapter {
    fn id(&self) -> SourceId {
        SourceId::Google
    }

    fn deadline_floor(&self) -> Duration {
        Duration::from_millis(800)
    }

    #[instrument(skip(self, query, ctx), fields(source = "google"))]
    async fn search(
        &self,
        query: &Query,
        ctx: &AdapterContext,
        deadline: Deadline,
        evasion: EvasionStrategy,
    ) -> Result<Vec<RawOffer>, FetchError> {
        deadline.checked_remaining()?;

        let html = if evasion.needs_browser() {
            self.fetch_via_browser(query, ctx, deadline).await?
        } else {
            self.fetch_via_http(query, ctx, deadline, evasion).await?
        };

        if html.contains("unusual traffic") || html.contains("/sorry/") {
            return Err(FetchError::BotChallenge(
                "traffic interstitial returned".to_string(),
            ));
        }

        let itineraries = parser::parse_results_page(&html)?;
        debug!(count = itineraries.len(), "Metasearch itineraries decoded");
        Ok(itineraries
            .into_iter()
            .map(|itin| RawOffer::new(SourceId::Google, RawPayload::Google(itin)))
            .collect())
    }

    async fn health_check(&self, ctx: &AdapterContext) -> bool {
        let shape = RequestShape::impersonating(ImpersonateProfile::Chrome126)
            .with_cookies(manifest::google::CONSENT_COOKIE)
            .with_timeout(Duration::from_secs(10));
        match ctx
            .http
            .get(manifest::google::FLIGHTS_URL, &[("hl", "en")], &shape)
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

// ============================================================================
// Descriptor
// ============================================================================

/// Descriptor for the metasearch source.
pub fn google_descriptor() -> SourceDescriptor {
    SourceDescriptor {
        id: SourceId::Google,
        variant: SourceVariant::BinaryMetasearch,
        credentials: farescout_core::CredentialsKind::None,
        rate_limit: BucketConfig::new(5.0, 0.5),
        timeout: Duration::from_secs(30),
        deadline_floor: Duration::from_millis(800),
        evasion: || {
            EvasionLadder::new(vec![
                EvasionStrategy::Impersonate(ImpersonateProfile::Chrome126),
                EvasionStrategy::ImpersonateProxy(ImpersonateProfile::Chrome126),
                EvasionStrategy::BrowserSession,
            ])
        },
        carriers: &[],
        build: |_creds: &SourceCredentials| Arc::new(GoogleAdapter::new()),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_page_url_params() {
        let query = Query::one_way("ICN", "NRT", NaiveDate::from_ymd_opt(2026, 4, 15).unwrap())
            .with_currency("KRW");
        let (url, params) = GoogleAdapter::page_url(&query);
        assert_eq!(url, manifest::google::FLIGHTS_URL);
        assert!(params.iter().any(|(k, _)| k == "tfs"));
        assert!(params.iter().any(|(k, v)| k == "curr" && v == "KRW"));
    }

    #[test]
    fn test_descriptor_ladder_ends_in_browser() {
        let desc = google_descriptor();
        let ladder = desc.evasion_ladder();
        assert_eq!(
            *ladder.rungs().last().unwrap(),
            EvasionStrategy::BrowserSession
        );
    }
}
