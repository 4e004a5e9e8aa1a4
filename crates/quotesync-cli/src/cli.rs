use clap::Parser;

use quotesync_core::batch::DEFAULT_WORKERS;

/// Real-time quote loader: EODHD → destination table, full replace per run.
///
/// Connection, credential, and query settings come from the environment
/// (`DB_HOST`, `DB_NAME`, `DB_USER`, `DB_ACCESS_TOKEN`, `TARGET_TABLE`,
/// `TICKER_SQL`, `EODHD_API_TOKEN`); the flags below override tuning
/// defaults only.
#[derive(Debug, Parser)]
#[command(
    name = "quotesync",
    author,
    version,
    about = "Load real-time quotes into the destination table"
)]
pub struct Cli {
    /// Outbound requests per second across the whole pool.
    /// Overrides REQUESTS_PER_SEC.
    #[arg(long)]
    pub requests_per_sec: Option<u32>,

    /// Size of the worker pool.
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,
}
