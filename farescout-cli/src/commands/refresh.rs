//! The `refresh` command.

use anyhow::Result;
use clap::Args;
use farescout_engine::{bootstrap, RefreshConfig, RefreshScheduler};

use crate::Cli;

/// Arguments for the refresh command.
#[derive(Args)]
pub struct RefreshArgs {
    /// Run a single round and exit instead of looping.
    #[arg(long)]
    pub once: bool,

    /// Include medium-tier routes in the round.
    #[arg(long)]
    pub medium: bool,

    /// Maximum concurrently running refresh jobs.
    #[arg(long, default_value_t = 4)]
    pub max_concurrent: usize,
}

/// Runs the refresh command.
pub async fn run(args: &RefreshArgs, cli: &Cli) -> Result<()> {
    let config = crate::load_config(cli)?;
    let service = bootstrap(&config, None).await?;

    let refresh_config = RefreshConfig {
        max_concurrent: args.max_concurrent,
        ..RefreshConfig::default()
    };
    let scheduler = RefreshScheduler::new(service, refresh_config);

    if args.once {
        scheduler.run_once(args.medium).await;
        return Ok(());
    }

    println!("Refresh scheduler running; Ctrl-C to stop.");
    let handle = scheduler.spawn();
    tokio::signal::ctrl_c().await?;
    handle.abort();
    Ok(())
}
