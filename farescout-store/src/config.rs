//! Configuration management.
//!
//! Typed configuration persisted as JSON under the platform config dir.
//! Adapter sections are keyed by source CLI name so the file stays
//! readable and diff-friendly.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::tiers::TierTtls;

// ============================================================================
// Adapter Config
// ============================================================================

/// Tier override for one adapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierOverride {
    /// Let the router decide.
    #[default]
    Auto,
    /// Always primary.
    Primary,
    /// Always complementary.
    Complementary,
    /// Always fallback.
    Fallback,
}

/// Rate-limit settings for one adapter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Bucket capacity.
    pub capacity: f64,
    /// Tokens per second.
    pub refill_per_sec: f64,
}

/// Credentials for one adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Static API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// OAuth2 client id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// OAuth2 client secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

/// Configuration for one adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Whether the adapter participates at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Rate-limit override; descriptor default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitConfig>,
    /// Per-call timeout override, milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Tier override.
    #[serde(default)]
    pub tier_override: TierOverride,
    /// Credentials.
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Executor / Circuit / Pool Config
// ============================================================================

/// Fan-out executor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorSettings {
    /// Hard deadline for interactive queries, milliseconds.
    pub interactive_deadline_ms: u64,
    /// Deadline for background refreshes, milliseconds.
    pub background_deadline_ms: u64,
    /// Grace window after the first result, milliseconds.
    pub first_response_grace_ms: u64,
    /// Sub-deadline before the fallback tier launches, milliseconds.
    pub fallback_sub_deadline_ms: u64,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            interactive_deadline_ms: 4_000,
            background_deadline_ms: 60_000,
            first_response_grace_ms: 200,
            fallback_sub_deadline_ms: 1_500,
        }
    }
}

/// Circuit breaker settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitSettings {
    /// Consecutive upstream failures before the circuit opens.
    pub failure_threshold: u32,
    /// Window the failures must fall within, milliseconds.
    pub window_ms: u64,
    /// Cooldown before a half-open probe, milliseconds.
    pub cooldown_ms: u64,
}

impl Default for CircuitSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            window_ms: 60_000,
            cooldown_ms: 30_000,
        }
    }
}

/// Browser pool settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserPoolSettings {
    /// Number of long-lived instances; zero disables automation.
    pub size: usize,
    /// Explicit Chrome binary path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_executable: Option<PathBuf>,
}

/// Proxy pool settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyPoolSettings {
    /// Residential proxy endpoints.
    #[serde(default)]
    pub endpoints: Vec<String>,
    /// Maximum concurrent leases.
    #[serde(default = "default_proxy_concurrent")]
    pub max_concurrent: usize,
}

fn default_proxy_concurrent() -> usize {
    4
}

// ============================================================================
// Config
// ============================================================================

/// Full engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Per-adapter sections, keyed by source CLI name.
    #[serde(default)]
    pub adapters: HashMap<String, AdapterConfig>,
    /// Cache TTLs per route tier.
    #[serde(default)]
    pub cache: CacheSettings,
    /// Executor deadlines and grace windows.
    #[serde(default)]
    pub executor: ExecutorSettings,
    /// Circuit breaker tuning.
    #[serde(default)]
    pub circuit: CircuitSettings,
    /// Browser pool.
    #[serde(default)]
    pub browser_pool: BrowserPoolSettings,
    /// Proxy pool.
    #[serde(default)]
    pub proxy_pool: ProxyPoolSettings,
}

/// Cache settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Tier TTLs.
    #[serde(default)]
    pub tier_ttls: TierTtlsConfig,
}

/// Serializable wrapper around [`TierTtls`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierTtlsConfig(pub TierTtls);

impl Default for TierTtlsConfig {
    fn default() -> Self {
        Self(TierTtls::default())
    }
}

impl Config {
    /// Default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("farescout")
            .join("config.json")
    }

    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, StoreError> {
        Self::load_from(&Self::default_path())
    }

    /// Loads configuration from a specific path, defaulting when absent.
    pub fn load_from(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Saves configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// The adapter section for a source, defaulted when absent.
    pub fn adapter(&self, cli_name: &str) -> AdapterConfig {
        self.adapters.get(cli_name).cloned().unwrap_or(AdapterConfig {
            enabled: true,
            ..AdapterConfig::default()
        })
    }

    /// Whether an adapter is enabled.
    pub fn is_adapter_enabled(&self, cli_name: &str) -> bool {
        self.adapters.get(cli_name).is_none_or(|a| a.enabled)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn test_missing_file_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/config.json")).unwrap();
        assert_eq!(config.executor.interactive_deadline_ms, 4_000);
        assert!(config.is_adapter_enabled("google"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.adapters.insert(
            "kiwi".to_string(),
            AdapterConfig {
                enabled: false,
                tier_override: TierOverride::Fallback,
                ..AdapterConfig::default()
            },
        );
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert!(!loaded.is_adapter_enabled("kiwi"));
        assert_eq!(loaded.adapter("kiwi").tier_override, TierOverride::Fallback);
        // Unlisted adapters default to enabled.
        assert!(loaded.is_adapter_enabled("google"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let json = r#"{"executor": {"interactive_deadline_ms": 2000,
            "background_deadline_ms": 30000,
            "first_response_grace_ms": 150,
            "fallback_sub_deadline_ms": 1000}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.executor.interactive_deadline_ms, 2_000);
        assert_eq!(config.circuit.failure_threshold, 3);
    }
}
