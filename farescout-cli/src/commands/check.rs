//! The `check` command.

use anyhow::Result;
use clap::Args;
use farescout_core::SourceId;
use farescout_engine::bootstrap;

use crate::{Cli, OutputFormat};

/// Arguments for the check command.
#[derive(Args)]
pub struct CheckArgs {
    /// Source to check; all sources when omitted.
    #[arg(long, short)]
    pub source: Option<String>,
}

/// Runs the check command.
pub async fn run(args: &CheckArgs, cli: &Cli) -> Result<()> {
    let sources: Vec<SourceId> = match &args.source {
        Some(name) => {
            let Some(id) = SourceId::from_cli_name(name) else {
                anyhow::bail!("Unknown source: {name}");
            };
            vec![id]
        }
        None => SourceId::all().to_vec(),
    };

    let config = crate::load_config(cli)?;
    let service = bootstrap(&config, None).await?;

    for source in sources {
        let reachable = service.executor().probe(source).await;
        if cli.format == OutputFormat::Json {
            println!(
                r#"{{"source":"{}","reachable":{reachable}}}"#,
                source.cli_name()
            );
        } else {
            let mark = if reachable { "✓" } else { "✗" };
            println!("{:<14} {mark}", source.display_name());
        }
    }
    Ok(())
}
