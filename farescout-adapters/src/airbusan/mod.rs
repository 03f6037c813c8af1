//! Air Busan adapter.
//!
//! The site sits behind a JS-challenge WAF that allowlists the Naver
//! search-crawler User-Agent, so the baseline request shape is the
//! crawler identity rather than a browser build. No session, cookies,
//! or CSRF tokens are needed.

pub(crate) mod normalize;
pub mod parser;

use async_trait::async_trait;
use farescout_core::{CredentialsKind, Query, SourceId, SourceVariant};
use farescout_fetch::{
    AdapterContext, BucketConfig, Deadline, EvasionLadder, EvasionStrategy, FetchError,
    ImpersonateProfile, RequestShape, ResponseExt,
};
use reqwest::header::{HeaderName, HeaderValue, ORIGIN, REFERER};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::adapter::Adapter;
use crate::descriptor::{SourceCredentials, SourceDescriptor};
use crate::evasion_shape;
use crate::manifest;
use crate::raw::{RawOffer, RawPayload};

pub use parser::{AirBusanFare, AirBusanFlight};

// ============================================================================
// Adapter
// ============================================================================

/// Air Busan availability adapter.
#[derive(Debug, Default)]
pub struct AirBusanAdapter;

impl AirBusanAdapter {
    /// Creates the adapter.
    pub fn new() -> Self {
        Self
    }

    fn shape(evasion: EvasionStrategy, deadline: Deadline) -> Result<RequestShape, FetchError> {
        let profile = evasion
            .profile()
            .unwrap_or(ImpersonateProfile::SearchCrawler);
        Ok(RequestShape::impersonating(profile)
            .with_header(
                HeaderName::from_static("x-requested-with"),
                HeaderValue::from_static("XMLHttpRequest"),
            )
            .with_header(
                REFERER,
                HeaderValue::from_static(manifest::airbusan::REFERER),
            )
            .with_header(
                ORIGIN,
                HeaderValue::from_static(manifest::airbusan::ORIGIN),
            )
            .with_timeout(deadline.checked_remaining()?))
    }

    fn avail_url() -> String {
        format!(
            "{}{}",
            manifest::airbusan::ORIGIN,
            manifest::airbusan::AVAIL_PATH
        )
    }

    fn form_for(query: &Query) -> Vec<(String, String)> {
        vec![
            ("tripType".to_string(), "OW".to_string()),
            ("depCity1".to_string(), query.origin.clone()),
            ("arrCity1".to_string(), query.destination.clone()),
            (
                "depDate1".to_string(),
                query.departure_date.format("%Y%m%d").to_string(),
            ),
            (
                "paxCountAd".to_string(),
                query.passengers.adults.to_string(),
            ),
            (
                "paxCountCh".to_string(),
                query.passengers.children.to_string(),
            ),
            (
                "paxCountIn".to_string(),
                (query.passengers.infants_in_seat + query.passengers.infants_on_lap).to_string(),
            ),
            ("bookingCategory".to_string(), "Individual".to_string()),
        ]
    }
}

#[async_trait]
impl Adapter for AirBusanAdapter {
    fn id(&self) -> SourceId {
        SourceId::AirBusan
    }

    #[instrument(skip(self, query, ctx), fields(source = "airbusan"))]
    async fn search(
        &self,
        query: &Query,
        ctx: &AdapterContext,
        deadline: Deadline,
        evasion: EvasionStrategy,
    ) -> Result<Vec<RawOffer>, FetchError> {
        let shape = Self::shape(evasion, deadline)?;
        let (shape, _proxy_guard) = evasion_shape::apply(shape, ctx, evasion, deadline).await?;

        let form = Self::form_for(query);
        let response = ctx
            .http
            .post_form(&Self::avail_url(), &form, &shape)
            .await?
            .check_status()?;
        let body = response.text().await?;

        // A blocked UA gets the challenge page instead of JSON.
        if body.trim_start().starts_with('<') {
            return Err(FetchError::BotChallenge(
                "challenge page instead of JSON".to_string(),
            ));
        }

        let flights = parser::parse_avail_response(&body, &query.origin, &query.destination)?;
        Ok(flights
            .into_iter()
            .map(|flight| RawOffer::new(SourceId::AirBusan, RawPayload::AirBusan(flight)))
            .collect())
    }

    async fn health_check(&self, ctx: &AdapterContext) -> bool {
        let Ok(shape) = Self::shape(
            EvasionStrategy::Impersonate(ImpersonateProfile::SearchCrawler),
            Deadline::after(Duration::from_secs(10)),
        ) else {
            return false;
        };
        let form = [
            ("tripType", "OW"),
            ("depCity1", "PUS"),
            ("arrCity1", "CJU"),
            ("depDate1", "20260401"),
            ("paxCountAd", "1"),
            ("paxCountCh", "0"),
            ("paxCountIn", "0"),
            ("bookingCategory", "Individual"),
        ];
        matches!(
            ctx.http.post_form(&Self::avail_url(), &form, &shape).await,
            Ok(response) if response.status().is_success()
        )
    }
}

// ============================================================================
// Descriptor
// ============================================================================

/// Descriptor for the Air Busan source.
pub fn airbusan_descriptor() -> SourceDescriptor {
    SourceDescriptor {
        id: SourceId::AirBusan,
        variant: SourceVariant::PerAirlineReverse,
        credentials: CredentialsKind::None,
        rate_limit: BucketConfig::new(3.0, 0.5),
        timeout: Duration::from_secs(30),
        deadline_floor: Duration::from_millis(500),
        evasion: || {
            EvasionLadder::new(vec![
                EvasionStrategy::Impersonate(ImpersonateProfile::SearchCrawler),
                EvasionStrategy::ImpersonateProxy(ImpersonateProfile::SearchCrawler),
            ])
        },
        carriers: &["BX"],
        build: |_creds: &SourceCredentials| Arc::new(AirBusanAdapter::new()),
    }
}

// ============================================================================
// Tests
// ============================================================================
