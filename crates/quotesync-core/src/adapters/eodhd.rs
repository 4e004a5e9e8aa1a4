use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::domain::{RealTimeQuote, Ticker};
use crate::error::FetchError;
use crate::gate::RequestGate;
use crate::http_client::{HttpClient, HttpRequest, HttpResponse};

const DEFAULT_BASE_URL: &str = "https://eodhd.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Total attempts per ticker, counting the first request.
const MAX_ATTEMPTS: u32 = 3;
/// Backoff when a 429 carries no usable Retry-After header.
const FALLBACK_BACKOFF: Duration = Duration::from_secs(5);

/// EODHD real-time quote client, shared across the worker pool.
///
/// Every attempt consumes one token from the shared request gate before the
/// request leaves the process, so a retry re-enters the global throttle.
/// Only 429 responses are retried; any other status and any transport
/// failure aborts the ticker on the spot.
#[derive(Clone)]
pub struct EodhdClient {
    http: Arc<dyn HttpClient>,
    gate: RequestGate,
    api_token: String,
    base_url: String,
    timeout: Duration,
}

impl EodhdClient {
    pub fn new(http: Arc<dyn HttpClient>, gate: RequestGate, api_token: impl Into<String>) -> Self {
        Self {
            http,
            gate,
            api_token: api_token.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch the real-time quote for one ticker.
    pub async fn realtime(&self, ticker: &Ticker) -> Result<RealTimeQuote, FetchError> {
        let url = self.realtime_url(ticker);

        for attempt in 1..=MAX_ATTEMPTS {
            self.gate.acquire().await;

            let response = self
                .http
                .execute(HttpRequest::get(&url).with_timeout(self.timeout))
                .await?;

            if response.status == 429 {
                if attempt == MAX_ATTEMPTS {
                    break;
                }
                let wait = retry_after(&response).unwrap_or(FALLBACK_BACKOFF);
                warn!(
                    ticker = %ticker,
                    wait_secs = wait.as_secs(),
                    attempt,
                    max_attempts = MAX_ATTEMPTS,
                    "rate limited by upstream; backing off"
                );
                tokio::time::sleep(wait).await;
                continue;
            }

            if !response.is_success() {
                return Err(FetchError::Status {
                    status: response.status,
                });
            }

            let quote: RealTimeQuote = serde_json::from_str(&response.body)?;
            if quote.is_empty() {
                return Err(FetchError::NoData);
            }
            return Ok(quote);
        }

        Err(FetchError::RateLimitExhausted {
            attempts: MAX_ATTEMPTS,
        })
    }

    fn realtime_url(&self, ticker: &Ticker) -> String {
        format!(
            "{base}/api/real-time/{ticker}?api_token={token}&fmt=json",
            base = self.base_url,
            ticker = urlencoding::encode(ticker.as_str()),
            token = urlencoding::encode(&self.api_token),
        )
    }
}

/// Server-hinted wait: integer seconds, floored at one second. Anything else
/// falls back to the fixed delay.
fn retry_after(response: &HttpResponse) -> Option<Duration> {
    let header = response.header("retry-after")?;
    let seconds = header.trim().parse::<u64>().ok()?;
    Some(Duration::from_secs(seconds.max(1)))
}
