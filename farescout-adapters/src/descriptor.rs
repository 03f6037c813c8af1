//! Source descriptor system.
//!
//! A descriptor carries the static configuration for one source: its
//! variant, credentials kind, rate-limit defaults, evasion ladder, the
//! carriers it serves directly (for router coverage), and the factory
//! that builds its adapter.

use farescout_core::{CredentialsKind, SourceId, SourceVariant};
use farescout_fetch::{BucketConfig, EvasionLadder};
use std::sync::Arc;
use std::time::Duration;

use crate::adapter::Adapter;

// ============================================================================
// Source Credentials
// ============================================================================

/// Runtime credentials for one source, resolved from configuration.
#[derive(Debug, Clone, Default)]
pub struct SourceCredentials {
    /// Static API key.
    pub api_key: Option<String>,
    /// OAuth2 client id.
    pub client_id: Option<String>,
    /// OAuth2 client secret.
    pub client_secret: Option<String>,
}

impl SourceCredentials {
    /// Credentials with only an API key.
    pub fn api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
            ..Self::default()
        }
    }

    /// OAuth2 client-credentials pair.
    pub fn oauth(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            client_id: Some(id.into()),
            client_secret: Some(secret.into()),
            ..Self::default()
        }
    }

    /// Whether the given credentials kind is satisfied.
    pub fn satisfies(&self, kind: CredentialsKind) -> bool {
        match kind {
            CredentialsKind::None => true,
            CredentialsKind::ApiKey | CredentialsKind::SharedKey => self.api_key.is_some(),
            CredentialsKind::Oauth => self.client_id.is_some() && self.client_secret.is_some(),
        }
    }
}

// ============================================================================
// Source Descriptor
// ============================================================================

/// Static configuration for one upstream source.
pub struct SourceDescriptor {
    /// Source identifier.
    pub id: SourceId,
    /// Wire/anti-bot class.
    pub variant: SourceVariant,
    /// Credentials the source needs.
    pub credentials: CredentialsKind,
    /// Default rate-limit bucket.
    pub rate_limit: BucketConfig,
    /// Default per-call timeout.
    pub timeout: Duration,
    /// Minimum deadline budget worth starting a call with.
    pub deadline_floor: Duration,
    /// Ordered anti-bot ladder.
    pub evasion: fn() -> EvasionLadder,
    /// Carriers this source answers for directly (router coverage).
    pub carriers: &'static [&'static str],
    /// Builds the adapter with resolved credentials.
    pub build: fn(&SourceCredentials) -> Arc<dyn Adapter>,
}

impl SourceDescriptor {
    /// Display name of the source.
    pub fn display_name(&self) -> &'static str {
        self.id.display_name()
    }

    /// Whether this source serves the given carrier directly.
    pub fn serves_carrier(&self, carrier: &str) -> bool {
        self.carriers.contains(&carrier)
    }

    /// Builds the evasion ladder.
    pub fn evasion_ladder(&self) -> EvasionLadder {
        (self.evasion)()
    }

    /// Builds the adapter.
    pub fn build_adapter(&self, credentials: &SourceCredentials) -> Arc<dyn Adapter> {
        (self.build)(credentials)
    }
}

impl std::fmt::Debug for SourceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDescriptor")
            .field("id", &self.id)
            .field("variant", &self.variant)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}
