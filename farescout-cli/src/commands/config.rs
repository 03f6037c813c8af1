//! The `config` command.

use anyhow::Result;
use clap::{Args, Subcommand};
use farescout_store::Config;

use crate::Cli;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    /// Config action.
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Write a default configuration file.
    Init,
    /// Print the configuration file path.
    Path,
}

/// Runs the config command.
pub fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(Config::default_path);

    match args.action {
        ConfigAction::Show => {
            let config = Config::load_from(&path)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Init => {
            if path.exists() {
                anyhow::bail!("Config already exists at {}", path.display());
            }
            Config::default().save_to(&path)?;
            println!("Wrote default config to {}", path.display());
        }
        ConfigAction::Path => {
            println!("{}", path.display());
        }
    }
    Ok(())
}
