mod cli;
mod config;
mod error;

use std::collections::HashSet;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use quotesync_core::{run_batch, EodhdClient, ReqwestHttpClient, RequestGate, Ticker};
use quotesync_warehouse::{Destination, PgSinkOpener};

use crate::cli::Cli;
use crate::config::Config;
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(cause) => {
            error!(%cause, "fatal");
            ExitCode::from(cause.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let config = Config::from_env()?;
    let requests_per_sec = cli.requests_per_sec.unwrap_or(config.requests_per_sec);

    let gate = RequestGate::new(requests_per_sec);
    info!(requests_per_sec, "global request throttle configured");

    let mut destination = Destination::connect(&config.destination).await?;

    let universe = destination.ticker_universe(&config.ticker_sql).await?;
    let tickers = parse_universe(universe);
    if tickers.is_empty() {
        warn!("no tickers to process; exiting");
        destination.close().await?;
        return Ok(ExitCode::SUCCESS);
    }
    info!(count = tickers.len(), "ticker universe loaded");

    info!(table = %config.target_table, "clearing destination table");
    let deleted = destination.clear_table(&config.target_table).await?;
    info!(deleted, "destination table cleared");
    destination.close().await?;

    let client = build_client(&config, gate);
    let opener = PgSinkOpener::new(&config.destination, &config.target_table)?;

    info!(universe = tickers.len(), workers = cli.workers, "processing tickers");
    let report = run_batch(client, opener, tickers, cli.workers).await;

    info!(
        inserted = report.inserted,
        universe = report.universe,
        table = %config.target_table,
        "batch complete"
    );
    Ok(ExitCode::SUCCESS)
}

fn build_client(config: &Config, gate: RequestGate) -> EodhdClient {
    let mut client = EodhdClient::new(
        Arc::new(ReqwestHttpClient::new()),
        gate,
        config.api_token.clone(),
    );
    if let Some(base_url) = &config.api_base_url {
        client = client.with_base_url(base_url.clone());
    }
    client
}

/// Validate and deduplicate the raw universe. An unusable value is a
/// per-ticker problem, not a fatal one: it is logged and dropped.
fn parse_universe(raw: Vec<String>) -> Vec<Ticker> {
    let mut seen = HashSet::new();
    let mut tickers = Vec::with_capacity(raw.len());
    for value in raw {
        match Ticker::parse(&value) {
            Ok(ticker) => {
                if seen.insert(ticker.clone()) {
                    tickers.push(ticker);
                }
            }
            Err(cause) => warn!(value = %value, %cause, "dropping unusable ticker"),
        }
    }
    tickers
}

#[cfg(test)]
mod tests {
    use super::parse_universe;

    #[test]
    fn universe_is_validated_and_deduplicated() {
        let raw = vec![
            "AAPL.US".to_owned(),
            " MSFT.US ".to_owned(),
            "AAPL.US".to_owned(),
            "bad ticker".to_owned(),
            String::new(),
        ];

        let tickers = parse_universe(raw);
        let tickers: Vec<&str> = tickers.iter().map(|ticker| ticker.as_str()).collect();
        assert_eq!(tickers, ["AAPL.US", "MSFT.US"]);
    }
}
