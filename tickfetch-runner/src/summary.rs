//! Per-ticker outcomes and the batch summary built from them.

use std::collections::BTreeMap;

/// What happened to one ticker in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickerOutcome {
    /// Output file already existed; nothing was fetched.
    Skipped,
    /// Fetched and persisted `rows` records.
    Saved { rows: usize },
    /// Fetch or persistence failed.
    Failed { reason: String },
}

/// Summary of a batch run.
///
/// `failures` is the authoritative result: a ticker absent from it either
/// was saved or was skipped because its output already existed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub saved: BTreeMap<String, usize>,
    pub skipped: Vec<String>,
    pub failures: BTreeMap<String, String>,
}

impl BatchSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn record(&mut self, ticker: &str, outcome: TickerOutcome) {
        match outcome {
            TickerOutcome::Skipped => self.skipped.push(ticker.to_string()),
            TickerOutcome::Saved { rows } => {
                self.saved.insert(ticker.to_string(), rows);
            }
            TickerOutcome::Failed { reason } => {
                self.failures.insert(ticker.to_string(), reason);
            }
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Tickers recorded so far.
    pub fn completed(&self) -> usize {
        self.saved.len() + self.skipped.len() + self.failures.len()
    }
}
