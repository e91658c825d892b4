//! Split and dividend back-adjustment of intraday bars.
//!
//! Every bar is tagged with its US/Eastern calendar date. For that date the
//! adjuster looks up:
//! - the cumulative split factor: product of all split ratios dated strictly
//!   after the bar's date (reverse cumulative product over sorted splits)
//! - the cumulative dividend amount: sum of all dividends dated strictly after
//!   the bar's date (reverse cumulative sum over sorted dividends)
//!
//! Prices are divided by the split factor and then reduced by the dividend
//! amount; volume is multiplied by the split factor. Bars with no later
//! corporate actions carry 1.0 and 0.0 and come out unchanged.

use chrono::{DateTime, NaiveDate};
use chrono_tz::America::New_York;
use thiserror::Error;

use crate::domain::{AdjustedBar, Bar, DividendEvent, SplitEvent, SplitRecord};

#[derive(Debug, Error)]
pub enum AdjustError {
    #[error("malformed split ratio '{ratio}' on {date}")]
    MalformedRatio { date: NaiveDate, ratio: String },

    #[error("invalid bar timestamp: {0}")]
    InvalidTimestamp(i64),
}

/// US-market calendar date of a Unix timestamp.
pub fn market_date(timestamp: i64) -> Result<NaiveDate, AdjustError> {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.with_timezone(&New_York).date_naive())
        .ok_or(AdjustError::InvalidTimestamp(timestamp))
}

/// Step function over calendar dates built from a reverse cumulative fold.
///
/// `values[i]` is the fold of every event at index `>= i`; `values[n]` is the
/// neutral element. Lookup finds the first event dated after the query date.
struct CumulativeSchedule {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl CumulativeSchedule {
    fn build(
        mut events: Vec<(NaiveDate, f64)>,
        neutral: f64,
        combine: impl Fn(f64, f64) -> f64,
    ) -> Self {
        events.sort_by_key(|(date, _)| *date);

        let mut values = vec![neutral; events.len() + 1];
        for i in (0..events.len()).rev() {
            values[i] = combine(events[i].1, values[i + 1]);
        }

        Self {
            dates: events.into_iter().map(|(date, _)| date).collect(),
            values,
        }
    }

    /// Cumulative value of all events dated strictly after `date`.
    fn after(&self, date: NaiveDate) -> f64 {
        let idx = self.dates.partition_point(|d| *d <= date);
        self.values[idx]
    }
}

/// Parse every split record, failing on the first malformed ratio.
pub fn parse_splits(records: &[SplitRecord]) -> Result<Vec<SplitEvent>, AdjustError> {
    records.iter().map(SplitRecord::parse).collect()
}

/// Cumulative split factor for each date in `dates`.
pub fn split_factors(splits: &[SplitEvent], dates: &[NaiveDate]) -> Vec<f64> {
    let schedule = CumulativeSchedule::build(
        splits.iter().map(|s| (s.date, s.ratio)).collect(),
        1.0,
        |ratio, later| ratio * later,
    );
    dates.iter().map(|d| schedule.after(*d)).collect()
}

/// Cumulative dividend amount for each date in `dates`.
pub fn dividend_amounts(dividends: &[DividendEvent], dates: &[NaiveDate]) -> Vec<f64> {
    let schedule = CumulativeSchedule::build(
        dividends.iter().map(|d| (d.date, d.value)).collect(),
        0.0,
        |value, later| value + later,
    );
    dates.iter().map(|d| schedule.after(*d)).collect()
}

/// Back-adjust a raw intraday series for later splits and dividends.
///
/// Empty split or dividend tables are neutral. Output order matches input.
pub fn adjust_bars(
    bars: &[Bar],
    splits: &[SplitEvent],
    dividends: &[DividendEvent],
) -> Result<Vec<AdjustedBar>, AdjustError> {
    let dates = bars
        .iter()
        .map(|b| market_date(b.timestamp))
        .collect::<Result<Vec<_>, _>>()?;

    let factors = split_factors(splits, &dates);
    let amounts = dividend_amounts(dividends, &dates);

    let adjusted = bars
        .iter()
        .zip(dates)
        .zip(factors.into_iter().zip(amounts))
        .map(|((bar, date), (factor, amount))| AdjustedBar {
            timestamp: bar.timestamp,
            datetime: bar.datetime,
            date,
            open: bar.open / factor - amount,
            high: bar.high / factor - amount,
            low: bar.low / factor - amount,
            close: bar.close / factor - amount,
            volume: bar.volume * factor,
            split_factor: factor,
            dividend_amount: amount,
        })
        .collect();

    Ok(adjusted)
}

/// [`adjust_bars`] over provider split records, parsing their ratios first.
pub fn adjust_with_records(
    bars: &[Bar],
    splits: &[SplitRecord],
    dividends: &[DividendEvent],
) -> Result<Vec<AdjustedBar>, AdjustError> {
    let splits = parse_splits(splits)?;
    adjust_bars(bars, &splits, dividends)
}
