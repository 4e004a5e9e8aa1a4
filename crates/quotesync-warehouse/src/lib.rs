//! Destination database access for quotesync.
//!
//! The destination is a relational table reached over the network. Startup
//! work (the ticker universe query and the full-replace table clear) runs on
//! a single orchestrator connection owned by [`Destination`]; each batch
//! worker later opens exactly one connection of its own through
//! [`PgSinkOpener`] and keeps it for the lifetime of the worker.
//!
//! All row values travel as bound query parameters. The destination table
//! name is the one identifier that must be interpolated into SQL text, so it
//! is validated up front by [`TableName`].

pub mod sink;
pub mod table;

use sqlx::postgres::PgConnectOptions;
use sqlx::{ConnectOptions, Connection, PgConnection, Row};
use thiserror::Error;

pub use sink::{PgQuoteSink, PgSinkOpener, QuoteRow, QuoteSink, SinkOpener};
pub use table::TableName;

/// Errors raised by destination access.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("invalid destination table '{value}': {reason}")]
    InvalidTable { value: String, reason: &'static str },

    #[error("invalid destination host '{value}': expected 'host' or 'host:port'")]
    InvalidHost { value: String },

    #[error("destination sink is already closed")]
    SinkClosed,
}

/// Bearer credential presented to the destination at connect time.
///
/// The token is short-lived and scoped to the destination database; it is
/// acquired fresh at startup and must never appear in logs.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Connection parameters for the destination database.
#[derive(Debug, Clone)]
pub struct DestinationConfig {
    /// Server identity, `host` or `host:port`.
    pub host: String,
    pub database: String,
    pub user: String,
    pub token: AccessToken,
}

impl DestinationConfig {
    /// Build driver connect options, presenting the access token as the
    /// connection password.
    pub fn connect_options(&self) -> Result<PgConnectOptions, WarehouseError> {
        let (host, port) = split_host_port(&self.host)?;
        let mut options = PgConnectOptions::new()
            .host(host)
            .database(&self.database)
            .username(&self.user)
            .password(self.token.secret());
        if let Some(port) = port {
            options = options.port(port);
        }
        Ok(options)
    }
}

fn split_host_port(value: &str) -> Result<(&str, Option<u16>), WarehouseError> {
    let invalid = || WarehouseError::InvalidHost {
        value: value.to_owned(),
    };

    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    match trimmed.rsplit_once(':') {
        Some((host, port)) => {
            if host.is_empty() {
                return Err(invalid());
            }
            let port = port.parse::<u16>().map_err(|_| invalid())?;
            Ok((host, Some(port)))
        }
        None => Ok((trimmed, None)),
    }
}

/// Orchestrator-side connection used for startup work.
pub struct Destination {
    connection: PgConnection,
}

impl Destination {
    pub async fn connect(config: &DestinationConfig) -> Result<Self, WarehouseError> {
        let options = config.connect_options()?;
        let connection = options.connect().await?;
        Ok(Self { connection })
    }

    /// Run the caller-supplied universe query. The first column of each
    /// result row yields a ticker; NULL and empty values are dropped.
    pub async fn ticker_universe(&mut self, sql: &str) -> Result<Vec<String>, WarehouseError> {
        let rows = sqlx::query(sql).fetch_all(&mut self.connection).await?;

        let mut tickers = Vec::with_capacity(rows.len());
        for row in &rows {
            let value: Option<String> = row.try_get(0)?;
            let Some(value) = value else { continue };
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                tickers.push(trimmed.to_owned());
            }
        }
        Ok(tickers)
    }

    /// Delete every existing row from the destination table in a single
    /// transaction. The run is full-replace: this must succeed before any
    /// worker attempts its first insert.
    pub async fn clear_table(&mut self, table: &TableName) -> Result<u64, WarehouseError> {
        let mut tx = self.connection.begin().await?;
        let deleted = sqlx::query(&format!("DELETE FROM {}", table.as_str()))
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(deleted)
    }

    /// Release the startup connection before the worker pool takes over.
    pub async fn close(self) -> Result<(), WarehouseError> {
        self.connection.close().await?;
        Ok(())
    }
}
