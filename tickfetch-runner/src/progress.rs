//! Progress reporting for multi-ticker batches.

use tracing::{info, warn};

use crate::summary::{BatchSummary, TickerOutcome};

/// Progress callback for batch operations.
///
/// Called from worker threads in the parallel downloader, so implementations
/// must be `Sync`.
pub trait DownloadProgress: Send + Sync {
    /// Called when a ticker is picked up.
    fn on_start(&self, ticker: &str, index: usize, total: usize);

    /// Called when a ticker finishes; `completed` counts finished tickers so far.
    fn on_complete(&self, ticker: &str, completed: usize, total: usize, outcome: &TickerOutcome);

    /// Called once when the whole batch is done.
    fn on_batch_complete(&self, summary: &BatchSummary);
}

/// Reports progress through `tracing`.
pub struct LogProgress {
    /// Emit a running count every this many completions.
    pub every: usize,
}

impl Default for LogProgress {
    fn default() -> Self {
        Self { every: 10 }
    }
}

impl DownloadProgress for LogProgress {
    fn on_start(&self, ticker: &str, index: usize, total: usize) {
        info!("[{}/{}] {ticker}", index + 1, total);
    }

    fn on_complete(&self, ticker: &str, completed: usize, total: usize, outcome: &TickerOutcome) {
        match outcome {
            TickerOutcome::Skipped => info!(ticker, "csv file already exists, skipped"),
            TickerOutcome::Saved { rows } => info!(ticker, rows, "saved"),
            TickerOutcome::Failed { reason } => warn!(ticker, error = %reason, "ticker failed"),
        }
        if self.every > 0 && completed % self.every == 0 {
            info!("progress: {completed}/{total} done");
        }
    }

    fn on_batch_complete(&self, summary: &BatchSummary) {
        info!(
            "batch complete: {} saved, {} skipped, {} failed of {}",
            summary.saved.len(),
            summary.skipped.len(),
            summary.failures.len(),
            summary.total
        );
    }
}

/// Discards all progress events.
pub struct NoProgress;

impl DownloadProgress for NoProgress {
    fn on_start(&self, _ticker: &str, _index: usize, _total: usize) {}

    fn on_complete(&self, _ticker: &str, _completed: usize, _total: usize, _outcome: &TickerOutcome) {
    }

    fn on_batch_complete(&self, _summary: &BatchSummary) {}
}
