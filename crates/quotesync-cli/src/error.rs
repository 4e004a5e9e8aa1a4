use thiserror::Error;

use quotesync_warehouse::WarehouseError;

use crate::config::ConfigError;

/// Fatal startup failures: missing configuration, credential/connect
/// failure, ticker-query failure, table-clear failure. Per-ticker failures
/// never surface here; they are absorbed inside the worker pool.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),
}

impl CliError {
    /// Startup failures of every kind exit 1; a completed run exits 0.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::Warehouse(_) => 1,
        }
    }
}
