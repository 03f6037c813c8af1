//! Aggregator API adapter.
//!
//! Straight REST with an API key header and a firm request budget: the
//! public tier allows 5 req/s, enforced locally by the source's token
//! bucket before any call leaves the process.

pub(crate) mod normalize;
pub mod parser;

use async_trait::async_trait;
use farescout_core::{CabinClass, CredentialsKind, Query, SourceId, SourceVariant};
use farescout_fetch::{
    AdapterContext, BucketConfig, Deadline, EvasionLadder, EvasionStrategy, FetchError,
    RequestShape, ResponseExt,
};
use reqwest::header::{HeaderName, HeaderValue};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::adapter::Adapter;
use crate::descriptor::{SourceCredentials, SourceDescriptor};
use crate::manifest;
use crate::raw::{RawOffer, RawPayload};

pub use parser::{KiwiItinerary, KiwiSegment};

fn cabin_code(cabin: CabinClass) -> &'static str {
    match cabin {
        CabinClass::Economy => "M",
        CabinClass::PremiumEconomy => "W",
        CabinClass::Business => "C",
        CabinClass::First => "F",
    }
}

// ============================================================================
// Adapter
// ============================================================================

/// Aggregator search adapter.
#[derive(Debug)]
pub struct KiwiAdapter {
    api_key: String,
}

impl KiwiAdapter {
    /// Creates the adapter with its API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    fn shape(&self, deadline: Deadline) -> Result<RequestShape, FetchError> {
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| FetchError::AuthFailed("API key is not header-safe".to_string()))?;
        Ok(RequestShape::plain()
            .with_header(
                HeaderName::from_static(manifest::kiwi::API_KEY_HEADER),
                key,
            )
            .with_timeout(deadline.checked_remaining()?))
    }
}

#[async_trait]
impl Adapter for KiwiAdapter {
    fn id(&self) -> SourceId {
        SourceId::Kiwi
    }

    #[instrument(skip(self, query, ctx), fields(source = "kiwi"))]
    async fn search(
        &self,
        query: &Query,
        ctx: &AdapterContext,
        deadline: Deadline,
        _evasion: EvasionStrategy,
    ) -> Result<Vec<RawOffer>, FetchError> {
        if self.api_key.is_empty() {
            return Err(FetchError::AuthFailed("no API key configured".to_string()));
        }

        let date = query.departure_date.format("%d/%m/%Y").to_string();
        let adults = query.passengers.adults.to_string();
        let params: Vec<(&str, &str)> = vec![
            ("fly_from", query.origin.as_str()),
            ("fly_to", query.destination.as_str()),
            ("date_from", date.as_str()),
            ("date_to", date.as_str()),
            ("adults", adults.as_str()),
            ("selected_cabins", cabin_code(query.cabin)),
            ("curr", query.currency.as_str()),
            ("sort", "price"),
            ("limit", "50"),
        ];

        let shape = self.shape(deadline)?;
        let response = ctx
            .http
            .get(manifest::kiwi::SEARCH_URL, &params, &shape)
            .await?
            .check_status()?;
        let body = response.text().await?;

        let itineraries = parser::parse_search_response(&body, &query.currency)?;
        Ok(itineraries
            .into_iter()
            .map(|itin| RawOffer::new(SourceId::Kiwi, RawPayload::Kiwi(itin)))
            .collect())
    }

    async fn health_check(&self, ctx: &AdapterContext) -> bool {
        if self.api_key.is_empty() {
            return false;
        }
        let Ok(shape) = self.shape(Deadline::after(Duration::from_secs(10))) else {
            return false;
        };
        // A deliberately tiny query; any 2xx means reachable + key valid.
        let params = [
            ("fly_from", "ICN"),
            ("fly_to", "NRT"),
            ("limit", "1"),
        ];
        matches!(
            ctx.http.get(manifest::kiwi::SEARCH_URL, &params, &shape).await,
            Ok(response) if response.status().is_success()
        )
    }
}

// ============================================================================
// Descriptor
// ============================================================================

/// Descriptor for the aggregator source.
pub fn kiwi_descriptor() -> SourceDescriptor {
    SourceDescriptor {
        id: SourceId::Kiwi,
        variant: SourceVariant::AggregatorApi,
        credentials: CredentialsKind::ApiKey,
        rate_limit: BucketConfig::new(5.0, 5.0),
        timeout: Duration::from_secs(30),
        deadline_floor: Duration::from_millis(500),
        evasion: || EvasionLadder::single(EvasionStrategy::Direct),
        carriers: &[],
        build: |creds: &SourceCredentials| {
            Arc::new(KiwiAdapter::new(creds.api_key.clone().unwrap_or_default()))
        },
    }
}

// ============================================================================
// Tests
// ============================================================================
