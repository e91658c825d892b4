//! Batch downloader: fetch each ticker, persist it, isolate failures.
//!
//! A ticker whose output file already exists is skipped without contacting
//! the provider, so an interrupted batch resumes where it stopped.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use rayon::prelude::*;
use thiserror::Error;
use tickfetch_core::{DataKind, FetchError, FetchRange, MarketDataProvider};
use tracing::debug;

use crate::progress::DownloadProgress;
use crate::storage::{CsvStore, StorageError};
use crate::summary::{BatchSummary, TickerOutcome};
use crate::tickers::is_valid_ticker;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("0 rows returned")]
    EmptyResult,

    #[error("invalid ticker '{0}'")]
    InvalidTicker(String),

    #[error("provider returned {got} data for a {requested} request")]
    KindMismatch { requested: DataKind, got: DataKind },

    #[error("worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// What to download for every ticker in a batch.
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub kind: DataKind,
    pub range: FetchRange,
    /// Treat an empty provider response as a failure instead of saving
    /// a header-only file.
    pub empty_is_failure: bool,
}

/// Fetch and persist one ticker.
pub fn download_ticker(
    provider: &dyn MarketDataProvider,
    store: &CsvStore,
    ticker: &str,
    opts: &BatchOptions,
) -> Result<TickerOutcome, DownloadError> {
    if !is_valid_ticker(ticker) {
        return Err(DownloadError::InvalidTicker(ticker.to_string()));
    }
    if store.exists(opts.kind, ticker) {
        return Ok(TickerOutcome::Skipped);
    }

    let dataset = provider.fetch(opts.kind, ticker, &opts.range)?;
    if dataset.kind() != opts.kind {
        return Err(DownloadError::KindMismatch {
            requested: opts.kind,
            got: dataset.kind(),
        });
    }
    if dataset.is_empty() && opts.empty_is_failure {
        return Err(DownloadError::EmptyResult);
    }

    let rows = dataset.len();
    let path = store.write(ticker, &dataset)?;
    debug!(ticker, rows, path = %path.display(), "wrote dataset");
    Ok(TickerOutcome::Saved { rows })
}

/// Run one ticker, turning errors and panics into a failure record.
///
/// A panicking provider or store fails only its own ticker; sibling
/// tickers and the batch summary are unaffected.
fn isolated<F>(work: F) -> TickerOutcome
where
    F: FnOnce() -> Result<TickerOutcome, DownloadError>,
{
    match panic::catch_unwind(AssertUnwindSafe(work)) {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => TickerOutcome::Failed {
            reason: e.to_string(),
        },
        Err(payload) => TickerOutcome::Failed {
            reason: format!("panicked: {}", panic_message(payload.as_ref())),
        },
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Download tickers one after another.
pub fn download_batch(
    provider: &dyn MarketDataProvider,
    store: &CsvStore,
    tickers: &[String],
    opts: &BatchOptions,
    progress: &dyn DownloadProgress,
) -> BatchSummary {
    let total = tickers.len();
    let mut summary = BatchSummary::new(total);

    for (i, ticker) in tickers.iter().enumerate() {
        progress.on_start(ticker, i, total);
        let outcome = isolated(|| download_ticker(provider, store, ticker, opts));
        progress.on_complete(ticker, i + 1, total, &outcome);
        summary.record(ticker, outcome);
    }

    progress.on_batch_complete(&summary);
    summary
}

/// Download tickers on a pool of `workers` threads.
///
/// Produces the same summary as [`download_batch`]; only the order in which
/// tickers complete differs. The provider's own pacing applies per worker.
pub fn download_batch_parallel(
    provider: &dyn MarketDataProvider,
    store: &CsvStore,
    tickers: &[String],
    opts: &BatchOptions,
    workers: usize,
    progress: &dyn DownloadProgress,
) -> Result<BatchSummary, DownloadError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()?;

    let total = tickers.len();
    let summary = Mutex::new(BatchSummary::new(total));
    let completed = AtomicUsize::new(0);

    pool.install(|| {
        tickers.par_iter().enumerate().for_each(|(i, ticker)| {
            progress.on_start(ticker, i, total);
            let outcome = isolated(|| download_ticker(provider, store, ticker, opts));
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            progress.on_complete(ticker, done, total, &outcome);
            summary
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .record(ticker, outcome);
        });
    });

    let summary = summary.into_inner().unwrap_or_else(PoisonError::into_inner);
    progress.on_batch_complete(&summary);
    Ok(summary)
}
