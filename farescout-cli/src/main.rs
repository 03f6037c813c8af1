// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Farescout CLI - multi-source flight-fare search from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Search a route
//! farescout search ICN NRT 2026-04-15
//!
//! # Business cabin, prices in USD
//! farescout search ICN FRA 2026-04-15 --cabin business --currency USD
//!
//! # JSON output
//! farescout search ICN NRT 2026-04-15 --format json --pretty
//!
//! # Check source reachability
//! farescout check
//!
//! # List sources
//! farescout sources
//!
//! # Price history for a route
//! farescout history ICN NRT --from 2026-04-01 --to 2026-04-30
//!
//! # Run one background refresh round
//! farescout refresh --once
//! ```

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{check, config, history, refresh, search, sources};

// ============================================================================
// CLI Definition
// ============================================================================

/// Farescout CLI - parallel multi-source flight-fare search.
#[derive(Parser)]
#[command(name = "farescout")]
#[command(about = "Multi-source flight fare search and monitoring")]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Path to a configuration file.
    #[arg(long, global = true)]
    pub config: Option<std::path::PathBuf>,

    /// Verbose output (show debug logs).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Quiet mode (no logs).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Search fares for a route and date.
    #[command(visible_alias = "s")]
    Search(search::SearchArgs),

    /// Check source reachability.
    Check(check::CheckArgs),

    /// List configured sources.
    Sources,

    /// Show price history for a route.
    #[command(visible_alias = "h")]
    History(history::HistoryArgs),

    /// Run background refresh rounds.
    Refresh(refresh::RefreshArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON for scripting.
    Json,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }
    let filter = if verbose {
        EnvFilter::new("farescout=debug,info")
    } else {
        EnvFilter::new("farescout=warn")
    };
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Search(args) => search::run(args, &cli).await,
        Commands::Check(args) => check::run(args, &cli).await,
        Commands::Sources => sources::run(&cli),
        Commands::History(args) => history::run(args, &cli).await,
        Commands::Refresh(args) => refresh::run(args, &cli).await,
        Commands::Config(args) => config::run(args, &cli),
    };

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e}");
        }
        std::process::exit(1);
    }
    Ok(())
}

/// Loads the configuration honoring the `--config` flag.
pub fn load_config(cli: &Cli) -> Result<farescout_store::Config> {
    let config = match &cli.config {
        Some(path) => farescout_store::Config::load_from(path)?,
        None => farescout_store::Config::load()?,
    };
    Ok(config)
}
