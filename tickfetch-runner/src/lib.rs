//! Tickfetch Runner: batch downloads, CSV storage, ticker lists, adjustment.
//!
//! This crate builds on `tickfetch-core` to provide:
//! - TOML download configuration and token resolution
//! - Per-ticker CSV storage with atomic writes and resume by file presence
//! - Sequential and worker-pool batch downloads with per-ticker failure isolation
//! - Ticker list loading
//! - The stored-data adjustment pass

pub mod adjust;
pub mod config;
pub mod download;
pub mod progress;
pub mod storage;
pub mod summary;
pub mod tickers;

pub use adjust::{adjust_batch, adjust_ticker, AdjustTickerError};
pub use config::{ConfigError, DownloadConfig};
pub use download::{
    download_batch, download_batch_parallel, download_ticker, BatchOptions, DownloadError,
};
pub use progress::{DownloadProgress, LogProgress, NoProgress};
pub use storage::{CsvStore, StorageError};
pub use summary::{BatchSummary, TickerOutcome};
pub use tickers::{clean_tickers, is_valid_ticker, load_tickers, TickerListError};
