//! Upstream market-data adapters.

mod eodhd;

pub use eodhd::EodhdClient;
