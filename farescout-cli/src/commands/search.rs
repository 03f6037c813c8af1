//! The `search` command.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use farescout_core::{CabinClass, PassengerCount, Query};
use farescout_engine::bootstrap;

use crate::output;
use crate::{Cli, OutputFormat};

/// Arguments for the search command.
#[derive(Args)]
pub struct SearchArgs {
    /// Origin airport (IATA-3).
    pub origin: String,

    /// Destination airport (IATA-3).
    pub destination: String,

    /// Departure date (YYYY-MM-DD).
    pub date: NaiveDate,

    /// Return date for a round trip (YYYY-MM-DD).
    #[arg(long)]
    pub return_date: Option<NaiveDate>,

    /// Cabin class.
    #[arg(long, default_value = "economy")]
    pub cabin: String,

    /// Result currency (ISO-4217).
    #[arg(long, default_value = "KRW")]
    pub currency: String,

    /// Adult passengers.
    #[arg(long, default_value_t = 1)]
    pub adults: u8,
}

/// Runs the search command.
pub async fn run(args: &SearchArgs, cli: &Cli) -> Result<()> {
    let cabin = CabinClass::parse(&args.cabin)
        .with_context(|| format!("Unknown cabin class '{}'", args.cabin))?;

    let mut query = Query::one_way(&args.origin, &args.destination, args.date)
        .with_cabin(cabin)
        .with_currency(&args.currency)
        .with_passengers(PassengerCount {
            adults: args.adults,
            ..PassengerCount::default()
        });
    if let Some(return_date) = args.return_date {
        query = query.with_return(return_date);
    }

    let config = crate::load_config(cli)?;
    let service = bootstrap(&config, None).await?;
    let response = service.search(&query).await?;

    match cli.format {
        OutputFormat::Json => output::json::print_search(&response, cli.pretty)?,
        OutputFormat::Text => output::text::print_search(&query, &response),
    }
    Ok(())
}
