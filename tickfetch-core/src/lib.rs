//! Tickfetch Core: market data kinds, fetching, assembly and adjustment.
//!
//! This crate contains:
//! - Domain types (bars, split and dividend events, adjusted bars)
//! - Data-kind descriptors (endpoint, output directory, columns)
//! - Date-range chunking under the provider's window limit
//! - The EODHD client with 429 cooldown and chunk-level error isolation
//! - Intraday assembly into a timestamp-ordered series
//! - Split/dividend back-adjustment

pub mod adjust;
pub mod data;
pub mod domain;
pub mod kind;

pub use adjust::{adjust_bars, adjust_with_records, AdjustError};
pub use data::{Dataset, EodhdClient, FetchError, FetchRange, MarketDataProvider};
pub use domain::{
    AdjustedBar, Bar, DividendEvent, ExchangeSymbol, IndexConstituent, SplitEvent, SplitRecord,
};
pub use kind::{BarInterval, DataKind};
