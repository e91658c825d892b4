//! Adjustment pass over stored data.
//!
//! Reads a ticker's raw intraday file plus its split and dividend tables,
//! back-adjusts the bars and writes them under `adjusted/`. A missing split
//! or dividend file counts as an empty table.

use thiserror::Error;
use tickfetch_core::{adjust_with_records, AdjustError, DataKind};
use tracing::{debug, info, warn};

use crate::storage::{CsvStore, StorageError};
use crate::summary::{BatchSummary, TickerOutcome};
use crate::tickers::is_valid_ticker;

#[derive(Debug, Error)]
pub enum AdjustTickerError {
    #[error("no intraday file for {0}")]
    MissingIntraday(String),

    #[error("invalid ticker '{0}'")]
    InvalidTicker(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Adjust(#[from] AdjustError),
}

/// Adjust one ticker and write the result. Returns the number of bars.
pub fn adjust_ticker(store: &CsvStore, ticker: &str) -> Result<usize, AdjustTickerError> {
    if !is_valid_ticker(ticker) {
        return Err(AdjustTickerError::InvalidTicker(ticker.to_string()));
    }
    if !store.exists(DataKind::Intraday, ticker) {
        return Err(AdjustTickerError::MissingIntraday(ticker.to_string()));
    }
    let bars = store.read_intraday(ticker)?;

    let splits = if store.exists(DataKind::Splits, ticker) {
        store.read_splits(ticker)?
    } else {
        debug!(ticker, "no split file, treating as no splits");
        Vec::new()
    };
    let dividends = if store.exists(DataKind::Dividends, ticker) {
        store.read_dividends(ticker)?
    } else {
        debug!(ticker, "no dividend file, treating as no dividends");
        Vec::new()
    };

    let adjusted = adjust_with_records(&bars, &splits, &dividends)?;
    store.write_adjusted(ticker, &adjusted)?;
    Ok(adjusted.len())
}

/// Adjust every ticker, skipping those already adjusted unless `overwrite`.
pub fn adjust_batch(store: &CsvStore, tickers: &[String], overwrite: bool) -> BatchSummary {
    let mut summary = BatchSummary::new(tickers.len());

    for ticker in tickers {
        if !overwrite && store.adjusted_exists(ticker) {
            summary.record(ticker, TickerOutcome::Skipped);
            continue;
        }
        let outcome = match adjust_ticker(store, ticker) {
            Ok(rows) => TickerOutcome::Saved { rows },
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "adjustment failed");
                TickerOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        summary.record(ticker, outcome);
    }

    info!(
        "adjusted {} tickers, {} skipped, {} failed",
        summary.saved.len(),
        summary.skipped.len(),
        summary.failures.len()
    );
    summary
}
