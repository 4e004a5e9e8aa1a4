use thiserror::Error;

use crate::http_client::HttpError;

/// Ticker validation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ticker cannot be empty")]
    EmptyTicker,
    #[error("ticker length {len} exceeds max {max}")]
    TickerTooLong { len: usize, max: usize },
    #[error("ticker contains invalid character '{ch}' at index {index}")]
    TickerInvalidChar { ch: char, index: usize },
}

/// Per-ticker fetch failures.
///
/// Every variant is recoverable at the worker boundary: the ticker is
/// skipped, logged, and contributes no row. Nothing here aborts the batch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] HttpError),

    #[error("upstream returned status {status}")]
    Status { status: u16 },

    #[error("rate limited after {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },

    #[error("failed to decode quote payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("empty quote payload")]
    NoData,
}
