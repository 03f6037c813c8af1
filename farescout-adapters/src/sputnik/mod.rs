//! Shared-tenant fare platform adapter.
//!
//! Eight airline tenants share one fare-search endpoint; the tenant id
//! rides in the path and a public key is shared across tenants. Each
//! tenant gets its own token bucket so one airline's traffic cannot
//! starve another's, and requests carry the tenant site's Referer to
//! satisfy the platform's CORS policy.

pub(crate) mod normalize;
pub mod parser;

use async_trait::async_trait;
use farescout_core::{CredentialsKind, Query, SourceId, SourceVariant};
use farescout_fetch::{
    AdapterContext, BucketConfig, Deadline, EvasionLadder, EvasionStrategy, FetchError,
    ImpersonateProfile, RequestShape, ResponseExt, TokenBucket,
};
use reqwest::header::{HeaderName, HeaderValue, REFERER};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::adapter::Adapter;
use crate::descriptor::{SourceCredentials, SourceDescriptor};
use crate::manifest;
use crate::raw::{RawOffer, RawPayload};

pub use parser::SputnikFare;

/// Tenants queried per search. The platform serves eight; the two
/// network carriers cover the long-haul routes this engine cares about.
const ACTIVE_TENANTS: &[&str] = &["af", "kl"];

// ============================================================================
// Adapter
// ============================================================================

/// Shared-tenant platform adapter.
pub struct SputnikAdapter {
    api_key: String,
    tenant_buckets: Vec<(&'static str, TokenBucket)>,
}

impl SputnikAdapter {
    /// Creates the adapter with the shared platform key.
    pub fn new(api_key: impl Into<String>) -> Self {
        let tenant_buckets = manifest::sputnik::TENANTS
            .iter()
            .map(|(tenant, _)| (*tenant, TokenBucket::new(BucketConfig::new(2.0, 0.5))))
            .collect();
        Self {
            api_key: api_key.into(),
            tenant_buckets,
        }
    }

    fn bucket(&self, tenant: &str) -> Option<&TokenBucket> {
        self.tenant_buckets
            .iter()
            .find(|(t, _)| *t == tenant)
            .map(|(_, b)| b)
    }

    async fn search_tenant(
        &self,
        tenant: &str,
        query: &Query,
        ctx: &AdapterContext,
        deadline: Deadline,
        profile: ImpersonateProfile,
    ) -> Result<Vec<SputnikFare>, FetchError> {
        let bucket = self
            .bucket(tenant)
            .ok_or_else(|| FetchError::Unusable(format!("unknown tenant '{tenant}'")))?;
        let permit = bucket.acquire(deadline).await?;

        let url = manifest::sputnik::FARE_SEARCH_URL.replace("{tenant}", tenant);
        let body = json!({
            "origin": query.origin,
            "destination": query.destination,
            "departureDaysInterval": 0,
            "routesLimit": 50,
            "faresLimit": 200,
            "currency": query.currency,
        });

        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| FetchError::AuthFailed("platform key is not header-safe".to_string()))?;
        let shape = RequestShape::impersonating(profile)
            .with_header(
                HeaderName::from_static(manifest::sputnik::API_KEY_HEADER),
                key,
            )
            .with_header(
                REFERER,
                HeaderValue::from_static(manifest::sputnik::REFERER),
            )
            .with_timeout(deadline.checked_remaining()?);

        let response = ctx.http.post_json(&url, &body, &shape).await?;
        permit.commit();
        let response = response.check_status()?;
        let text = response.text().await?;
        parser::parse_fare_response(&text, query)
    }
}

#[async_trait]
impl Adapter for SputnikAdapter {
    fn id(&self) -> SourceId {
        SourceId::Sputnik
    }

    #[instrument(skip(self, query, ctx), fields(source = "sputnik"))]
    async fn search(
        &self,
        query: &Query,
        ctx: &AdapterContext,
        deadline: Deadline,
        evasion: EvasionStrategy,
    ) -> Result<Vec<RawOffer>, FetchError> {
        if self.api_key.is_empty() {
            return Err(FetchError::AuthFailed(
                "no platform key configured".to_string(),
            ));
        }
        let profile = evasion
            .profile()
            .unwrap_or(ImpersonateProfile::Chrome131);

        let mut fares = Vec::new();
        let mut succeeded = 0usize;
        let mut last_err: Option<FetchError> = None;
        for tenant in ACTIVE_TENANTS {
            if deadline.expired() {
                break;
            }
            match self
                .search_tenant(tenant, query, ctx, deadline, profile)
                .await
            {
                Ok(mut tenant_fares) => {
                    succeeded += 1;
                    fares.append(&mut tenant_fares);
                }
                Err(e) => {
                    debug!(tenant, error = %e, "Tenant search failed");
                    last_err = Some(e);
                }
            }
        }

        // One answering tenant is a result, even an empty one; every
        // tenant failing is the source failing.
        if succeeded == 0 {
            if let Some(err) = last_err {
                return Err(err);
            }
        }
        Ok(fares
            .into_iter()
            .map(|fare| RawOffer::new(SourceId::Sputnik, RawPayload::Sputnik(fare)))
            .collect())
    }

    async fn health_check(&self, ctx: &AdapterContext) -> bool {
        if self.api_key.is_empty() {
            return false;
        }
        let url = manifest::sputnik::FARE_SEARCH_URL.replace("{tenant}", "af");
        let Ok(key) = HeaderValue::from_str(&self.api_key) else {
            return false;
        };
        let shape = RequestShape::impersonating(ImpersonateProfile::Chrome131)
            .with_header(
                HeaderName::from_static(manifest::sputnik::API_KEY_HEADER),
                key,
            )
            .with_timeout(Duration::from_secs(10));
        let body = json!({"routesLimit": 1, "faresLimit": 1});
        matches!(
            ctx.http.post_json(&url, &body, &shape).await,
            Ok(response) if response.status().is_success()
        )
    }
}

// ============================================================================
// Descriptor
// ============================================================================

/// Descriptor for the shared-tenant platform source.
pub fn sputnik_descriptor() -> SourceDescriptor {
    SourceDescriptor {
        id: SourceId::Sputnik,
        variant: SourceVariant::SharedTenantKey,
        credentials: CredentialsKind::SharedKey,
        rate_limit: BucketConfig::new(4.0, 1.0),
        timeout: Duration::from_secs(20),
        deadline_floor: Duration::from_millis(500),
        evasion: || {
            EvasionLadder::new(vec![
                EvasionStrategy::Impersonate(ImpersonateProfile::Chrome131),
                EvasionStrategy::ImpersonateProxy(ImpersonateProfile::Chrome131),
            ])
        },
        carriers: &["AF", "KL", "LX", "OS", "SN", "EN", "WK", "4Y"],
        build: |creds: &SourceCredentials| {
            Arc::new(SputnikAdapter::new(
                creds.api_key.clone().unwrap_or_default(),
            ))
        },
    }
}

// ============================================================================
// Tests
// ============================================================================
