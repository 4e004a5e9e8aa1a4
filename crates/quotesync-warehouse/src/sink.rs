//! Per-worker destination sinks.
//!
//! Each worker owns at most one [`QuoteSink`], opened lazily through a
//! [`SinkOpener`] on the worker's first insert and held for the rest of the
//! worker's lifetime. Sinks are never shared between workers.

use std::future::Future;
use std::pin::Pin;

use sqlx::postgres::PgConnectOptions;
use sqlx::{ConnectOptions, Connection, PgConnection};
use time::OffsetDateTime;

use crate::table::TableName;
use crate::{DestinationConfig, WarehouseError};

/// One destination row.
///
/// `currency` is not carried here: the loader writes it as NULL regardless
/// of what the upstream payload contains.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRow {
    pub ticker: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<i64>,
    /// Fetch time, UTC.
    pub created_at: OffsetDateTime,
    /// Source timestamp when the payload carried one, otherwise fetch time.
    pub read_at: OffsetDateTime,
}

/// Destination write handle owned by exactly one worker.
pub trait QuoteSink: Send {
    /// Insert one row in its own transaction. A failure is local to the row:
    /// the sink remains usable for subsequent inserts.
    fn insert<'a>(
        &'a mut self,
        row: &'a QuoteRow,
    ) -> Pin<Box<dyn Future<Output = Result<(), WarehouseError>> + Send + 'a>>;

    /// Release the underlying connection. Idempotent.
    fn close(&mut self) -> Pin<Box<dyn Future<Output = Result<(), WarehouseError>> + Send + '_>>;
}

/// Opens one sink per worker.
pub trait SinkOpener: Send + Sync {
    type Sink: QuoteSink;

    fn open(&self) -> Pin<Box<dyn Future<Output = Result<Self::Sink, WarehouseError>> + Send + '_>>;
}

/// Opener for Postgres-backed sinks; every call opens a fresh connection.
#[derive(Clone)]
pub struct PgSinkOpener {
    options: PgConnectOptions,
    insert_sql: String,
}

impl PgSinkOpener {
    pub fn new(config: &DestinationConfig, table: &TableName) -> Result<Self, WarehouseError> {
        Ok(Self {
            options: config.connect_options()?,
            insert_sql: insert_statement(table),
        })
    }
}

impl SinkOpener for PgSinkOpener {
    type Sink = PgQuoteSink;

    fn open(&self) -> Pin<Box<dyn Future<Output = Result<Self::Sink, WarehouseError>> + Send + '_>> {
        Box::pin(async move {
            let connection = self.options.connect().await?;
            Ok(PgQuoteSink {
                connection: Some(connection),
                insert_sql: self.insert_sql.clone(),
            })
        })
    }
}

/// One worker's persistent destination connection.
pub struct PgQuoteSink {
    connection: Option<PgConnection>,
    insert_sql: String,
}

impl QuoteSink for PgQuoteSink {
    fn insert<'a>(
        &'a mut self,
        row: &'a QuoteRow,
    ) -> Pin<Box<dyn Future<Output = Result<(), WarehouseError>> + Send + 'a>> {
        Box::pin(async move {
            let connection = self.connection.as_mut().ok_or(WarehouseError::SinkClosed)?;

            let mut tx = connection.begin().await?;
            sqlx::query(&self.insert_sql)
                .bind(&row.ticker)
                .bind(row.open)
                .bind(row.high)
                .bind(row.low)
                .bind(row.close)
                .bind(row.volume)
                .bind(row.created_at)
                .bind(row.read_at)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(())
        })
    }

    fn close(&mut self) -> Pin<Box<dyn Future<Output = Result<(), WarehouseError>> + Send + '_>> {
        Box::pin(async move {
            if let Some(connection) = self.connection.take() {
                connection.close().await?;
            }
            Ok(())
        })
    }
}

fn insert_statement(table: &TableName) -> String {
    format!(
        "INSERT INTO {table} \
         (ext2_ticker, open, high, low, close, volume, currency, \
          timestamp_created_utc, timestamp_read_utc) \
         VALUES ($1, $2, $3, $4, $5, $6, NULL, $7, $8)",
        table = table.as_str(),
    )
}
