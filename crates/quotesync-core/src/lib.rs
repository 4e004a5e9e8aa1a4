//! # Quotesync Core
//!
//! Batch logic for the quotesync loader: domain types, the EODHD quote
//! adapter with its retry loop, the shared request gate, and the worker-pool
//! orchestration.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Upstream market-data adapters (EODHD real-time) |
//! | [`batch`] | Worker pool, per-ticker processing, result aggregation |
//! | [`domain`] | Ticker, quote payload, epoch normalization |
//! | [`error`] | Validation and fetch error types |
//! | [`gate`] | Global outbound-request gate |
//! | [`http_client`] | HTTP transport abstraction |
//!
//! ## Control flow
//!
//! ```text
//! universe ──▶ work queue ──▶ worker 1..N
//!                              │  gate.acquire()
//!                              │  GET /api/real-time/{ticker}
//!                              │  normalize timestamp
//!                              │  insert via the worker's own connection
//!                              ▼
//!                        outcome channel ──▶ inserted-row count
//! ```
//!
//! Per-ticker failures of any kind are absorbed at the worker boundary; the
//! orchestrator only ever sees 0/1 outcomes.

pub mod adapters;
pub mod batch;
pub mod domain;
pub mod error;
pub mod gate;
pub mod http_client;

pub use adapters::EodhdClient;
pub use batch::{run_batch, BatchReport};
pub use domain::{epoch, RealTimeQuote, Ticker};
pub use error::{FetchError, ValidationError};
pub use gate::RequestGate;
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
