//! Source registry.
//!
//! Central lookup for all source descriptors, initialized lazily.

use farescout_core::SourceId;
use std::sync::OnceLock;

use crate::airbusan::airbusan_descriptor;
use crate::amadeus::amadeus_descriptor;
use crate::descriptor::SourceDescriptor;
use crate::eastar::eastar_descriptor;
use crate::google::google_descriptor;
use crate::kiwi::kiwi_descriptor;
use crate::lufthansa::lufthansa_descriptor;
use crate::sputnik::sputnik_descriptor;
use crate::turkish::turkish_descriptor;

static DESCRIPTORS: OnceLock<Vec<SourceDescriptor>> = OnceLock::new();

fn init_descriptors() -> Vec<SourceDescriptor> {
    vec![
        // Broad-coverage sources first.
        google_descriptor(),
        kiwi_descriptor(),
        // Airline-direct sources.
        sputnik_descriptor(),
        airbusan_descriptor(),
        eastar_descriptor(),
        // Credentialed sources.
        amadeus_descriptor(),
        lufthansa_descriptor(),
        // Last resort.
        turkish_descriptor(),
    ]
}

/// Global registry of all source descriptors.
pub struct SourceRegistry;

impl SourceRegistry {
    /// Returns all descriptors in registry order.
    pub fn all() -> &'static [SourceDescriptor] {
        DESCRIPTORS.get_or_init(init_descriptors)
    }

    /// Gets a descriptor by source id.
    pub fn get(id: SourceId) -> Option<&'static SourceDescriptor> {
        Self::all().iter().find(|d| d.id == id)
    }

    /// Looks up a descriptor by CLI name.
    pub fn get_by_cli_name(name: &str) -> Option<&'static SourceDescriptor> {
        SourceId::from_cli_name(name).and_then(Self::get)
    }

    /// Descriptors of sources that directly serve the given carrier.
    pub fn serving_carrier(carrier: &str) -> Vec<&'static SourceDescriptor> {
        Self::all()
            .iter()
            .filter(|d| d.serves_carrier(carrier))
            .collect()
    }

    /// Number of registered sources.
    pub fn count() -> usize {
        Self::all().len()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use farescout_core::SourceVariant;

    #[test]
    fn test_registry_covers_every_source_id() {
        assert_eq!(SourceRegistry::count(), SourceId::all().len());
        for id in SourceId::all() {
            let desc = SourceRegistry::get(*id);
            assert!(desc.is_some(), "missing descriptor for {id}");
            assert_eq!(desc.unwrap().id, *id);
        }
    }

    #[test]
    fn test_every_variant_represented() {
        let variants: std::collections::HashSet<SourceVariant> =
            SourceRegistry::all().iter().map(|d| d.variant).collect();
        assert_eq!(variants.len(), 7);
    }

    #[test]
    fn test_cli_name_lookup() {
        assert!(SourceRegistry::get_by_cli_name("google").is_some());
        assert!(SourceRegistry::get_by_cli_name("turkish").is_some());
        assert!(SourceRegistry::get_by_cli_name("nope").is_none());
    }

    #[test]
    fn test_carrier_coverage_lookup() {
        let serving_tk = SourceRegistry::serving_carrier("TK");
        assert!(serving_tk.iter().any(|d| d.id == SourceId::Turkish));

        let serving_lx = SourceRegistry::serving_carrier("LX");
        assert!(serving_lx.iter().any(|d| d.id == SourceId::Lufthansa));
        assert!(serving_lx.iter().any(|d| d.id == SourceId::Sputnik));
    }

    #[test]
    fn test_adapters_build_without_credentials() {
        use crate::descriptor::SourceCredentials;
        let creds = SourceCredentials::default();
        for desc in SourceRegistry::all() {
            let adapter = desc.build_adapter(&creds);
            assert_eq!(adapter.id(), desc.id);
        }
    }
}
