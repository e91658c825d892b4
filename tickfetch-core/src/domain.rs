//! Domain types: intraday bars, corporate actions, adjusted bars.
//!
//! Every record here is created once per fetch and never mutated afterwards.
//! Serde names match the persisted CSV headers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::adjust::AdjustError;

/// One intraday observation.
///
/// Within an assembled series, `timestamp` is strictly increasing and unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Seconds since the Unix epoch, UTC.
    pub timestamp: i64,
    /// `timestamp` as a UTC datetime. Primary ordering key of the series.
    pub datetime: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Split event as the provider reports it, with the ratio still in
/// `"numerator/denominator"` text form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRecord {
    pub date: NaiveDate,
    pub split: String,
}

impl SplitRecord {
    /// Parse the textual ratio into a [`SplitEvent`].
    ///
    /// `"10.000000/1.000000"` becomes a ratio of `10.0`. Anything other than
    /// exactly one `/` between two positive finite numbers is rejected.
    pub fn parse(&self) -> Result<SplitEvent, AdjustError> {
        let malformed = || AdjustError::MalformedRatio {
            date: self.date,
            ratio: self.split.clone(),
        };

        let mut parts = self.split.split('/');
        let (num, den) = match (parts.next(), parts.next(), parts.next()) {
            (Some(num), Some(den), None) => (num.trim(), den.trim()),
            _ => return Err(malformed()),
        };

        let num: f64 = num.parse().map_err(|_| malformed())?;
        let den: f64 = den.parse().map_err(|_| malformed())?;
        let ratio = num / den;
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(malformed());
        }

        Ok(SplitEvent {
            date: self.date,
            ratio,
        })
    }
}

/// A split with its ratio resolved to a single multiplier
/// (new shares per old share; `10.0` for a 10-for-1 split).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitEvent {
    pub date: NaiveDate,
    pub ratio: f64,
}

/// Cash dividend per share, unadjusted for later splits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DividendEvent {
    pub date: NaiveDate,
    pub value: f64,
}

/// A bar after split and dividend back-adjustment.
///
/// `split_factor` and `dividend_amount` are the values that were applied;
/// they are `1.0` and `0.0` for bars with no later corporate actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustedBar {
    pub timestamp: i64,
    pub datetime: DateTime<Utc>,
    /// US/Eastern calendar date of the bar.
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub split_factor: f64,
    pub dividend_amount: f64,
}

/// One row of an exchange symbol list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExchangeSymbol {
    pub code: String,
    pub name: Option<String>,
    pub country: Option<String>,
    pub exchange: Option<String>,
    pub currency: Option<String>,
    #[serde(rename = "Type")]
    pub kind: Option<String>,
    pub isin: Option<String>,
}

/// One index member in a historical constituents snapshot.
///
/// `date` is the snapshot key exactly as the provider sent it. `ticker` is
/// `code` qualified with the member's exchange when one is given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexConstituent {
    pub date: String,
    pub ticker: String,
    pub code: String,
    pub exchange: Option<String>,
    pub name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl IndexConstituent {
    /// Qualify a bare ticker with `.{suffix}`; already-qualified tickers are kept.
    pub fn qualify(&mut self, suffix: &str) {
        if !self.ticker.contains('.') && !suffix.is_empty() {
            self.ticker = format!("{}.{suffix}", self.ticker);
        }
    }
}
