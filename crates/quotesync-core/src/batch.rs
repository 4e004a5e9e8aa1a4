//! Worker-pool orchestration: fan fetch+insert work out, aggregate results.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use time::OffsetDateTime;
use tokio::sync::mpsc;
use tracing::{error, warn};

use quotesync_warehouse::{QuoteRow, QuoteSink, SinkOpener, WarehouseError};

use crate::adapters::EodhdClient;
use crate::domain::Ticker;

/// Default size of the worker pool.
pub const DEFAULT_WORKERS: usize = 25;

/// Outcome of one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    /// Tickers submitted to the pool.
    pub universe: usize,
    /// Rows written to the destination.
    pub inserted: usize,
}

/// Fan the ticker universe out across `workers` tasks and sum the per-ticker
/// outcomes in completion order.
///
/// Each worker pulls from a shared queue and owns at most one destination
/// sink, opened lazily on its first successful fetch and closed when the
/// queue drains, including after failed inserts. Per-ticker failures are
/// logged at the worker boundary and reported as zero; a crashed worker task
/// is logged without aborting the rest of the batch.
pub async fn run_batch<O>(
    client: EodhdClient,
    opener: O,
    tickers: Vec<Ticker>,
    workers: usize,
) -> BatchReport
where
    O: SinkOpener + Clone + 'static,
    O::Sink: 'static,
{
    let universe = tickers.len();
    let queue = Arc::new(Mutex::new(VecDeque::from(tickers)));
    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel::<usize>();

    let workers = workers.max(1);
    let mut handles = Vec::with_capacity(workers);
    for worker in 0..workers {
        let client = client.clone();
        let opener = opener.clone();
        let queue = Arc::clone(&queue);
        let outcome_tx = outcome_tx.clone();

        handles.push(tokio::spawn(async move {
            let mut sink: Option<O::Sink> = None;
            loop {
                let next = queue.lock().expect("ticker queue poisoned").pop_front();
                let Some(ticker) = next else { break };
                let outcome = process_ticker(&client, &opener, &mut sink, &ticker).await;
                let _ = outcome_tx.send(outcome);
            }

            if let Some(mut sink) = sink.take() {
                if let Err(error) = sink.close().await {
                    warn!(worker, %error, "failed to close worker connection");
                }
            }
        }));
    }
    drop(outcome_tx);

    let mut inserted = 0;
    while let Some(outcome) = outcome_rx.recv().await {
        inserted += outcome;
    }

    for handle in handles {
        if let Err(error) = handle.await {
            error!(%error, "worker task crashed");
        }
    }

    BatchReport { universe, inserted }
}

/// Fetch, normalize, and insert one ticker. Returns 1 for an inserted row,
/// 0 for a skipped or failed ticker.
async fn process_ticker<O>(
    client: &EodhdClient,
    opener: &O,
    sink: &mut Option<O::Sink>,
    ticker: &Ticker,
) -> usize
where
    O: SinkOpener,
{
    let quote = match client.realtime(ticker).await {
        Ok(quote) => quote,
        Err(error) => {
            warn!(ticker = %ticker, %error, "fetch failed; skipping");
            return 0;
        }
    };

    let created_at = OffsetDateTime::now_utc();
    let row = QuoteRow {
        ticker: ticker.as_str().to_owned(),
        open: quote.open,
        high: quote.high,
        low: quote.low,
        close: quote.close,
        volume: quote.volume,
        created_at,
        read_at: quote.read_at().unwrap_or(created_at),
    };

    let sink = match ensure_sink(opener, sink).await {
        Ok(sink) => sink,
        Err(error) => {
            error!(ticker = %ticker, %error, "could not open destination connection");
            return 0;
        }
    };

    match sink.insert(&row).await {
        Ok(()) => 1,
        Err(error) => {
            // The connection stays up: an insert failure is local to its row.
            error!(ticker = %ticker, %error, "insert failed");
            0
        }
    }
}

async fn ensure_sink<'a, O>(
    opener: &O,
    slot: &'a mut Option<O::Sink>,
) -> Result<&'a mut O::Sink, WarehouseError>
where
    O: SinkOpener,
{
    if slot.is_none() {
        *slot = Some(opener.open().await?);
    }
    Ok(slot.as_mut().expect("sink was just opened"))
}
