//! Ticker list loading.
//!
//! The list is a CSV with a `Ticker` column. A `-` cell means the row has no
//! listed ticker and is dropped, as are blanks and repeats.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

pub const TICKER_COLUMN: &str = "Ticker";

/// Sentinel for "no ticker" in the source list.
pub const NO_TICKER: &str = "-";

#[derive(Debug, Error)]
pub enum TickerListError {
    #[error("read ticker list: {0}")]
    Csv(#[from] csv::Error),

    #[error("ticker list has no '{0}' column")]
    MissingColumn(String),
}

/// Load tickers from a CSV file.
pub fn load_tickers(path: &Path) -> Result<Vec<String>, TickerListError> {
    let rdr = csv::Reader::from_path(path)?;
    read_ticker_column(rdr)
}

/// Load tickers from any CSV source.
pub fn tickers_from_reader<R: Read>(reader: R) -> Result<Vec<String>, TickerListError> {
    read_ticker_column(csv::Reader::from_reader(reader))
}

fn read_ticker_column<R: Read>(mut rdr: csv::Reader<R>) -> Result<Vec<String>, TickerListError> {
    let col = rdr
        .headers()?
        .iter()
        .position(|h| h.trim() == TICKER_COLUMN)
        .ok_or_else(|| TickerListError::MissingColumn(TICKER_COLUMN.to_string()))?;

    let mut cells = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if let Some(cell) = record.get(col) {
            cells.push(cell.to_string());
        }
    }
    Ok(clean_tickers(cells))
}

/// Whether a ticker is safe to use as a file name and a URL path segment.
pub fn is_valid_ticker(ticker: &str) -> bool {
    !ticker.is_empty()
        && !ticker.contains("..")
        && !ticker.chars().any(|c| {
            matches!(c, '/' | '\\' | '?' | '#' | '%') || c.is_whitespace() || c.is_control()
        })
}

/// Trim, drop sentinels and blanks, de-duplicate keeping first occurrence.
///
/// Entries that could escape the data directory or the request path
/// (see [`is_valid_ticker`]) are dropped with a warning.
pub fn clean_tickers<I, S>(tickers: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    tickers
        .into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty() && t != NO_TICKER)
        .filter(|t| {
            let ok = is_valid_ticker(t);
            if !ok {
                warn!(ticker = %t, "dropping ticker with path characters");
            }
            ok
        })
        .filter(|t| seen.insert(t.clone()))
        .collect()
}
