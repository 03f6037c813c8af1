//! The `history` command.

use anyhow::Result;
use chrono::{Duration, NaiveDate, Utc};
use clap::Args;
use farescout_engine::bootstrap;

use crate::{Cli, OutputFormat};

/// Arguments for the history command.
#[derive(Args)]
pub struct HistoryArgs {
    /// Origin airport (IATA-3).
    pub origin: String,

    /// Destination airport (IATA-3).
    pub destination: String,

    /// Range start (YYYY-MM-DD); 30 days back when omitted.
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Range end (YYYY-MM-DD); 90 days ahead when omitted.
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

/// Runs the history command.
pub async fn run(args: &HistoryArgs, cli: &Cli) -> Result<()> {
    let today = Utc::now().date_naive();
    let from = args.from.unwrap_or(today - Duration::days(30));
    let to = args.to.unwrap_or(today + Duration::days(90));

    let config = crate::load_config(cli)?;
    let service = bootstrap(&config, None).await?;
    let rows = service.prediction_data(
        &args.origin.to_ascii_uppercase(),
        &args.destination.to_ascii_uppercase(),
        from,
        to,
    )?;

    if cli.format == OutputFormat::Json {
        let body = if cli.pretty {
            serde_json::to_string_pretty(&rows)?
        } else {
            serde_json::to_string(&rows)?
        };
        println!("{body}");
        return Ok(());
    }

    if rows.is_empty() {
        println!("No history for {}->{} in range", args.origin, args.destination);
        return Ok(());
    }
    for row in rows {
        println!(
            "{}  {}  min {:>12.0}  avg {:>12.0}  max {:>12.0}  n={}",
            row.recorded_at.format("%Y-%m-%d %H:%M"),
            row.date,
            row.min_price,
            row.avg_price,
            row.max_price,
            row.sample_count,
        );
    }
    Ok(())
}
