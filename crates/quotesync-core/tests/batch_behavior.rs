//! Behavior tests for the batch worker pool.
//!
//! These run the real orchestration loop against a scripted transport and an
//! in-memory destination, verifying result aggregation, failure isolation,
//! and per-worker connection ownership.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use quotesync_core::{
    run_batch, EodhdClient, HttpClient, HttpError, HttpRequest, HttpResponse, RequestGate, Ticker,
};
use quotesync_warehouse::{QuoteRow, QuoteSink, SinkOpener, WarehouseError};

const QUOTE_BODY: &str = r#"{"open":10.0,"high":12.0,"low":9.5,"close":11.0,"volume":1000,"timestamp":1700000000}"#;
const NO_TIMESTAMP_BODY: &str = r#"{"open":10.0,"high":12.0,"low":9.5,"close":11.0,"volume":1000}"#;

/// Serves a canned response per ticker, inferred from the request URL.
/// Unknown tickers get a 404.
struct PerTickerTransport {
    routes: HashMap<String, HttpResponse>,
}

impl PerTickerTransport {
    fn new(routes: Vec<(&str, HttpResponse)>) -> Arc<Self> {
        Arc::new(Self {
            routes: routes
                .into_iter()
                .map(|(ticker, response)| (ticker.to_owned(), response))
                .collect(),
        })
    }
}

impl HttpClient for PerTickerTransport {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let response = self
            .routes
            .iter()
            .find(|(ticker, _)| request.url.contains(&format!("/api/real-time/{ticker}?")))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| HttpResponse::new(404, "not found"));
        Box::pin(async move { Ok(response) })
    }
}

/// In-memory destination shared across sinks; counts opens and closes.
#[derive(Clone, Default)]
struct MemoryOpener {
    rows: Arc<Mutex<Vec<QuoteRow>>>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    fail_tickers: Arc<Vec<String>>,
}

impl MemoryOpener {
    fn failing_for(tickers: &[&str]) -> Self {
        Self {
            fail_tickers: Arc::new(tickers.iter().map(|t| (*t).to_owned()).collect()),
            ..Self::default()
        }
    }

    fn rows(&self) -> Vec<QuoteRow> {
        self.rows.lock().expect("row store poisoned").clone()
    }
}

struct MemorySink {
    rows: Arc<Mutex<Vec<QuoteRow>>>,
    closed: Arc<AtomicUsize>,
    fail_tickers: Arc<Vec<String>>,
}

impl QuoteSink for MemorySink {
    fn insert<'a>(
        &'a mut self,
        row: &'a QuoteRow,
    ) -> Pin<Box<dyn Future<Output = Result<(), WarehouseError>> + Send + 'a>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            if self.fail_tickers.contains(&row.ticker) {
                return Err(WarehouseError::Database(sqlx::Error::Protocol(
                    "injected insert failure".into(),
                )));
            }
            self.rows
                .lock()
                .expect("row store poisoned")
                .push(row.clone());
            Ok(())
        })
    }

    fn close(&mut self) -> Pin<Box<dyn Future<Output = Result<(), WarehouseError>> + Send + '_>> {
        Box::pin(async move {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

impl SinkOpener for MemoryOpener {
    type Sink = MemorySink;

    fn open(&self) -> Pin<Box<dyn Future<Output = Result<Self::Sink, WarehouseError>> + Send + '_>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let sink = MemorySink {
            rows: Arc::clone(&self.rows),
            closed: Arc::clone(&self.closed),
            fail_tickers: Arc::clone(&self.fail_tickers),
        };
        Box::pin(async move { Ok(sink) })
    }
}

fn tickers(values: &[&str]) -> Vec<Ticker> {
    values
        .iter()
        .map(|value| Ticker::parse(value).expect("valid ticker"))
        .collect()
}

fn client(http: Arc<PerTickerTransport>) -> EodhdClient {
    EodhdClient::new(http, RequestGate::new(1_000), "demo-token")
}

#[tokio::test]
async fn every_valid_ticker_yields_exactly_one_row() {
    let universe = ["AAA.US", "BBB.US", "CCC.US", "DDD.US", "EEE.US"];
    let http = PerTickerTransport::new(
        universe
            .iter()
            .map(|ticker| (*ticker, HttpResponse::ok_json(QUOTE_BODY)))
            .collect(),
    );
    let opener = MemoryOpener::default();

    let report = run_batch(client(http), opener.clone(), tickers(&universe), 4).await;

    assert_eq!(report.universe, 5);
    assert_eq!(report.inserted, 5);

    let mut inserted: Vec<String> = opener.rows().into_iter().map(|row| row.ticker).collect();
    inserted.sort();
    assert_eq!(inserted, ["AAA.US", "BBB.US", "CCC.US", "DDD.US", "EEE.US"]);
}

#[tokio::test]
async fn failed_tickers_are_isolated_from_the_rest() {
    // 7 good tickers; one 404, one empty payload, one 500.
    let http = PerTickerTransport::new(vec![
        ("G1.US", HttpResponse::ok_json(QUOTE_BODY)),
        ("G2.US", HttpResponse::ok_json(QUOTE_BODY)),
        ("G3.US", HttpResponse::ok_json(QUOTE_BODY)),
        ("G4.US", HttpResponse::ok_json(QUOTE_BODY)),
        ("G5.US", HttpResponse::ok_json(QUOTE_BODY)),
        ("G6.US", HttpResponse::ok_json(QUOTE_BODY)),
        ("G7.US", HttpResponse::ok_json(QUOTE_BODY)),
        ("EMPTY.US", HttpResponse::ok_json("{}")),
        ("BROKEN.US", HttpResponse::new(500, "server error")),
    ]);
    let universe = [
        "G1.US", "G2.US", "G3.US", "G4.US", "G5.US", "G6.US", "G7.US", "EMPTY.US", "BROKEN.US",
        "MISSING.US",
    ];
    let opener = MemoryOpener::default();

    let report = run_batch(client(http), opener.clone(), tickers(&universe), 5).await;

    assert_eq!(report.universe, 10);
    assert_eq!(report.inserted, 7);

    let rows = opener.rows();
    assert_eq!(rows.len(), 7);
    assert!(rows.iter().all(|row| row.ticker.starts_with('G')));
}

#[tokio::test]
async fn insert_failures_count_zero_but_the_worker_connection_survives() {
    let universe = ["A.US", "B.US", "C.US", "D.US", "E.US", "F.US"];
    let http = PerTickerTransport::new(
        universe
            .iter()
            .map(|ticker| (*ticker, HttpResponse::ok_json(QUOTE_BODY)))
            .collect(),
    );
    let opener = MemoryOpener::failing_for(&["B.US", "E.US"]);

    let report = run_batch(client(http), opener.clone(), tickers(&universe), 2).await;

    assert_eq!(report.inserted, 4);
    // A failed insert must not force a reconnect: opens stay bounded by the
    // pool size even though failures happened mid-stream.
    let opened = opener.opened.load(Ordering::SeqCst);
    assert!(opened <= 2, "expected at most 2 sinks, saw {opened}");
    assert_eq!(opened, opener.closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn each_worker_owns_one_sink_and_closes_it() {
    let universe: Vec<String> = (0..20).map(|index| format!("T{index}.US")).collect();
    let routes: Vec<(&str, HttpResponse)> = universe
        .iter()
        .map(|ticker| (ticker.as_str(), HttpResponse::ok_json(QUOTE_BODY)))
        .collect();
    let http = PerTickerTransport::new(routes);
    let opener = MemoryOpener::default();

    let universe: Vec<&str> = universe.iter().map(String::as_str).collect();
    let report = run_batch(client(http), opener.clone(), tickers(&universe), 4).await;

    assert_eq!(report.inserted, 20);
    let opened = opener.opened.load(Ordering::SeqCst);
    assert!(opened >= 1 && opened <= 4, "saw {opened} sinks for 4 workers");
    assert_eq!(
        opened,
        opener.closed.load(Ordering::SeqCst),
        "every opened sink must be closed exactly once"
    );
}

#[tokio::test]
async fn read_at_uses_the_payload_timestamp_when_present() {
    let http = PerTickerTransport::new(vec![("TS.US", HttpResponse::ok_json(QUOTE_BODY))]);
    let opener = MemoryOpener::default();

    run_batch(client(http), opener.clone(), tickers(&["TS.US"]), 1).await;

    let rows = opener.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].read_at.unix_timestamp(), 1_700_000_000);
    assert_ne!(rows[0].read_at, rows[0].created_at);
}

#[tokio::test]
async fn read_at_falls_back_to_fetch_time_without_a_timestamp() {
    let http = PerTickerTransport::new(vec![("NT.US", HttpResponse::ok_json(NO_TIMESTAMP_BODY))]);
    let opener = MemoryOpener::default();

    run_batch(client(http), opener.clone(), tickers(&["NT.US"]), 1).await;

    let rows = opener.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].read_at, rows[0].created_at);
}

#[tokio::test]
async fn an_empty_universe_reports_zero_without_opening_connections() {
    let http = PerTickerTransport::new(vec![]);
    let opener = MemoryOpener::default();

    let report = run_batch(client(http), opener.clone(), Vec::new(), 25).await;

    assert_eq!(report.universe, 0);
    assert_eq!(report.inserted, 0);
    assert_eq!(opener.opened.load(Ordering::SeqCst), 0);
}
