//! The `sources` command.

use anyhow::Result;
use farescout_adapters::SourceRegistry;

use crate::{Cli, OutputFormat};

/// Runs the sources command.
pub fn run(cli: &Cli) -> Result<()> {
    let config = crate::load_config(cli)?;

    for descriptor in SourceRegistry::all() {
        let enabled = config.is_adapter_enabled(descriptor.id.cli_name());
        if cli.format == OutputFormat::Json {
            let row = serde_json::json!({
                "id": descriptor.id.cli_name(),
                "name": descriptor.display_name(),
                "variant": descriptor.variant,
                "trust": descriptor.id.trust_score(),
                "credentials": descriptor.credentials,
                "carriers": descriptor.carriers,
                "enabled": enabled,
            });
            println!("{row}");
        } else {
            let carriers = if descriptor.carriers.is_empty() {
                "broad".to_string()
            } else {
                descriptor.carriers.join(",")
            };
            let state = if enabled { "" } else { " (disabled)" };
            println!(
                "{:<14} {:<18} trust={:<3} carriers={carriers}{state}",
                descriptor.id.cli_name(),
                descriptor.variant.display_name(),
                descriptor.id.trust_score(),
            );
        }
    }
    Ok(())
}
