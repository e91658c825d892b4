//! Provider trait and structured fetch errors.
//!
//! The MarketDataProvider trait lets the batch downloader run against the
//! EODHD client in production and against in-memory fakes in tests.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use thiserror::Error;

use crate::domain::{Bar, DividendEvent, SplitRecord};
use crate::kind::DataKind;

/// Errors from fetching a ticker's data.
///
/// Displayed verbatim in the CLI and in batch failure maps.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("rate limited by provider ({attempts} attempts)")]
    RateLimited { attempts: u32 },

    #[error("invalid API token: {0}")]
    InvalidCredential(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("provider error: {0}")]
    Provider(String),
}

/// Inclusive date range requested for one ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FetchRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Start of the range as UTC midnight.
    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start.and_time(NaiveTime::MIN).and_utc()
    }

    /// End of the range as UTC midnight.
    pub fn end_utc(&self) -> DateTime<Utc> {
        self.end.and_time(NaiveTime::MIN).and_utc()
    }
}

/// One ticker's fetched table, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    Splits(Vec<SplitRecord>),
    Dividends(Vec<DividendEvent>),
    Intraday(Vec<Bar>),
}

impl Dataset {
    pub fn kind(&self) -> DataKind {
        match self {
            Dataset::Splits(_) => DataKind::Splits,
            Dataset::Dividends(_) => DataKind::Dividends,
            Dataset::Intraday(_) => DataKind::Intraday,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Dataset::Splits(rows) => rows.len(),
            Dataset::Dividends(rows) => rows.len(),
            Dataset::Intraday(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A source of per-ticker market data.
///
/// Implementations must be shareable across worker threads; the parallel
/// batch downloader calls `fetch` concurrently for different tickers.
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch one kind of data for one ticker over a date range.
    fn fetch(&self, kind: DataKind, ticker: &str, range: &FetchRange)
        -> Result<Dataset, FetchError>;
}
