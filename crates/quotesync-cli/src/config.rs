//! Environment configuration.
//!
//! Every destination and credential value is required; the throttle and the
//! API base URL have defaults. Missing any required value is a fatal startup
//! error.

use std::env;

use thiserror::Error;

use quotesync_warehouse::{AccessToken, DestinationConfig, TableName, WarehouseError};

pub const DEFAULT_REQUESTS_PER_SEC: u32 = 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {name}")]
    Missing { name: &'static str },

    #[error("environment variable {name} is not a number: '{value}'")]
    InvalidNumber { name: &'static str, value: String },

    #[error(transparent)]
    Destination(#[from] WarehouseError),
}

#[derive(Debug)]
pub struct Config {
    pub destination: DestinationConfig,
    pub target_table: TableName,
    pub ticker_sql: String,
    pub api_token: String,
    pub api_base_url: Option<String>,
    pub requests_per_sec: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let destination = DestinationConfig {
            host: required(&get, "DB_HOST")?,
            database: required(&get, "DB_NAME")?,
            user: required(&get, "DB_USER")?,
            token: AccessToken::new(required(&get, "DB_ACCESS_TOKEN")?),
        };
        // Reject a malformed host before touching the network.
        destination.connect_options()?;

        let target_table = TableName::parse(&required(&get, "TARGET_TABLE")?)?;
        let ticker_sql = required(&get, "TICKER_SQL")?;
        let api_token = required(&get, "EODHD_API_TOKEN")?;
        let api_base_url = get("EODHD_BASE_URL").filter(|value| !value.trim().is_empty());

        let requests_per_sec = match get("REQUESTS_PER_SEC") {
            Some(value) => {
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber {
                        name: "REQUESTS_PER_SEC",
                        value,
                    })?
            }
            None => DEFAULT_REQUESTS_PER_SEC,
        };

        Ok(Self {
            destination,
            target_table,
            ticker_sql,
            api_token,
            api_base_url,
            requests_per_sec,
        })
    }
}

fn required<F>(get: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing { name }),
    }
}
