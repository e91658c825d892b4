//! Per-ticker CSV storage.
//!
//! Layout: `{root}/{kind_dir}/{TICKER}.csv`, plus `{root}/adjusted/` for
//! back-adjusted intraday series, `{root}/symbols/` for exchange lists and
//! `{root}/constituents/` for index membership snapshots.
//!
//! Writes go to a `.csv.tmp` sibling and are renamed into place, so a file
//! under its final name is always complete. Its presence is the resume signal.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tickfetch_core::{
    AdjustedBar, Bar, DataKind, Dataset, DividendEvent, ExchangeSymbol, IndexConstituent,
    SplitRecord,
};

pub const ADJUSTED_DIR: &str = "adjusted";
pub const SYMBOLS_DIR: &str = "symbols";
pub const CONSTITUENTS_DIR: &str = "constituents";

const ADJUSTED_COLUMNS: &[&str] = &[
    "timestamp",
    "datetime",
    "date",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "split_factor",
    "dividend_amount",
];

const SYMBOL_COLUMNS: &[&str] = &[
    "Code", "Name", "Country", "Exchange", "Currency", "Type", "Isin",
];

const CONSTITUENT_COLUMNS: &[&str] = &[
    "Date", "Ticker", "Code", "Exchange", "Name", "Sector", "Industry", "StartDate", "EndDate",
];

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// CSV files rooted at a data directory.
#[derive(Debug, Clone)]
pub struct CsvStore {
    root: PathBuf,
}

impl CsvStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{root}/{kind_dir}/{ticker}.csv`
    pub fn path(&self, kind: DataKind, ticker: &str) -> PathBuf {
        self.root
            .join(kind.descriptor().dir)
            .join(format!("{ticker}.csv"))
    }

    pub fn adjusted_path(&self, ticker: &str) -> PathBuf {
        self.root.join(ADJUSTED_DIR).join(format!("{ticker}.csv"))
    }

    pub fn symbols_path(&self, exchange: &str) -> PathBuf {
        self.root.join(SYMBOLS_DIR).join(format!("{exchange}.csv"))
    }

    pub fn constituents_path(&self, index: &str) -> PathBuf {
        self.root.join(CONSTITUENTS_DIR).join(format!("{index}.csv"))
    }

    pub fn exists(&self, kind: DataKind, ticker: &str) -> bool {
        self.path(kind, ticker).is_file()
    }

    pub fn adjusted_exists(&self, ticker: &str) -> bool {
        self.adjusted_path(ticker).is_file()
    }

    /// Persist a fetched dataset under its kind's directory.
    pub fn write(&self, ticker: &str, dataset: &Dataset) -> Result<PathBuf, StorageError> {
        let kind = dataset.kind();
        let path = self.path(kind, ticker);
        let columns = kind.descriptor().columns;
        match dataset {
            Dataset::Splits(rows) => write_rows(&path, rows, columns)?,
            Dataset::Dividends(rows) => write_rows(&path, rows, columns)?,
            Dataset::Intraday(rows) => write_rows(&path, rows, columns)?,
        }
        Ok(path)
    }

    pub fn write_adjusted(
        &self,
        ticker: &str,
        bars: &[AdjustedBar],
    ) -> Result<PathBuf, StorageError> {
        let path = self.adjusted_path(ticker);
        write_rows(&path, bars, ADJUSTED_COLUMNS)?;
        Ok(path)
    }

    pub fn write_symbols(
        &self,
        exchange: &str,
        symbols: &[ExchangeSymbol],
    ) -> Result<PathBuf, StorageError> {
        let path = self.symbols_path(exchange);
        write_rows(&path, symbols, SYMBOL_COLUMNS)?;
        Ok(path)
    }

    /// Write index members; the `Ticker` column makes the file a ticker list.
    pub fn write_constituents(
        &self,
        index: &str,
        members: &[IndexConstituent],
    ) -> Result<PathBuf, StorageError> {
        let path = self.constituents_path(index);
        write_rows(&path, members, CONSTITUENT_COLUMNS)?;
        Ok(path)
    }

    pub fn read_intraday(&self, ticker: &str) -> Result<Vec<Bar>, StorageError> {
        read_rows(&self.path(DataKind::Intraday, ticker))
    }

    pub fn read_splits(&self, ticker: &str) -> Result<Vec<SplitRecord>, StorageError> {
        read_rows(&self.path(DataKind::Splits, ticker))
    }

    pub fn read_dividends(&self, ticker: &str) -> Result<Vec<DividendEvent>, StorageError> {
        read_rows(&self.path(DataKind::Dividends, ticker))
    }

    pub fn read_adjusted(&self, ticker: &str) -> Result<Vec<AdjustedBar>, StorageError> {
        read_rows(&self.adjusted_path(ticker))
    }
}

/// Write rows with a header, atomically.
///
/// `columns` is only written by hand for an empty table; otherwise the
/// header comes from the row type's field names.
fn write_rows<T: Serialize>(path: &Path, rows: &[T], columns: &[&str]) -> Result<(), StorageError> {
    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let tmp_path = path.with_extension("csv.tmp");
    let csv_err = |source| StorageError::Csv {
        path: tmp_path.clone(),
        source,
    };

    let mut wtr = csv::Writer::from_path(&tmp_path).map_err(csv_err)?;
    if rows.is_empty() {
        wtr.write_record(columns).map_err(csv_err)?;
    }
    for row in rows {
        wtr.serialize(row).map_err(csv_err)?;
    }
    wtr.flush().map_err(|source| StorageError::Io {
        path: tmp_path.clone(),
        source,
    })?;
    drop(wtr);

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        io_err(e)
    })
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StorageError> {
    let csv_err = |source| StorageError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut rdr = csv::Reader::from_path(path).map_err(csv_err)?;
    rdr.deserialize().collect::<Result<Vec<T>, _>>().map_err(csv_err)
}
