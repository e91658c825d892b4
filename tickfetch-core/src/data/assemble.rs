//! Intraday assembly: per-chunk provider records into one bar series.

use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;

use super::provider::FetchError;
use crate::domain::Bar;

/// Intraday record as the provider returns it.
///
/// Prices arrive under short codes (`o`, `h`, `l`, `c`, `v`); the long names
/// are accepted too. Missing or null values become NaN (volume 0).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawIntradayRecord {
    pub timestamp: i64,
    #[serde(default, alias = "open")]
    pub o: Option<f64>,
    #[serde(default, alias = "high")]
    pub h: Option<f64>,
    #[serde(default, alias = "low")]
    pub l: Option<f64>,
    #[serde(default, alias = "close")]
    pub c: Option<f64>,
    #[serde(default, alias = "volume")]
    pub v: Option<f64>,
}

/// Decode one chunk's JSON array into raw records.
pub fn parse_intraday_records(values: Vec<Value>) -> Result<Vec<RawIntradayRecord>, FetchError> {
    values
        .into_iter()
        .map(|v| {
            serde_json::from_value(v)
                .map_err(|e| FetchError::MalformedPayload(format!("intraday record: {e}")))
        })
        .collect()
}

/// Concatenate chunk responses into one series ordered by timestamp.
///
/// Duplicate timestamps across chunk boundaries keep the first occurrence.
/// No chunks, or only empty chunks, give an empty series.
pub fn assemble_intraday(chunks: Vec<Vec<RawIntradayRecord>>) -> Result<Vec<Bar>, FetchError> {
    let mut bars = Vec::with_capacity(chunks.iter().map(Vec::len).sum());

    for record in chunks.into_iter().flatten() {
        let datetime = DateTime::from_timestamp(record.timestamp, 0).ok_or_else(|| {
            FetchError::MalformedPayload(format!("invalid timestamp: {}", record.timestamp))
        })?;
        bars.push(Bar {
            timestamp: record.timestamp,
            datetime,
            open: record.o.unwrap_or(f64::NAN),
            high: record.h.unwrap_or(f64::NAN),
            low: record.l.unwrap_or(f64::NAN),
            close: record.c.unwrap_or(f64::NAN),
            volume: record.v.unwrap_or(0.0),
        });
    }

    // Stable sort keeps the earlier chunk's record first for dedup.
    bars.sort_by_key(|b| b.timestamp);
    bars.dedup_by_key(|b| b.timestamp);
    Ok(bars)
}
