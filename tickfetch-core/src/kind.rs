//! Data kinds and their descriptors.
//!
//! Each kind maps to one provider endpoint and one output directory. The
//! batch downloader and the CSV store dispatch on the kind tag.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which dataset to fetch for a ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Splits,
    Dividends,
    Intraday,
}

/// Static facts about a data kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindDescriptor {
    /// Human-readable dataset name used in logs.
    pub name: &'static str,
    /// Provider endpoint path, joined with `/{symbol}`.
    pub endpoint: &'static str,
    /// Directory under the data root holding one CSV per ticker.
    pub dir: &'static str,
    /// Columns of the persisted CSV, in order.
    pub columns: &'static [&'static str],
}

const SPLITS: KindDescriptor = KindDescriptor {
    name: "split",
    endpoint: "splits",
    dir: "split",
    columns: &["date", "split"],
};

const DIVIDENDS: KindDescriptor = KindDescriptor {
    name: "div",
    endpoint: "div",
    dir: "div",
    columns: &["date", "value"],
};

const INTRADAY: KindDescriptor = KindDescriptor {
    name: "intraday",
    endpoint: "intraday",
    dir: "intraday",
    columns: &["timestamp", "datetime", "open", "high", "low", "close", "volume"],
};

impl DataKind {
    pub const ALL: [DataKind; 3] = [DataKind::Splits, DataKind::Dividends, DataKind::Intraday];

    pub fn descriptor(self) -> &'static KindDescriptor {
        match self {
            DataKind::Splits => &SPLITS,
            DataKind::Dividends => &DIVIDENDS,
            DataKind::Intraday => &INTRADAY,
        }
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "split" | "splits" => Ok(DataKind::Splits),
            "div" | "dividend" | "dividends" => Ok(DataKind::Dividends),
            "intraday" => Ok(DataKind::Intraday),
            other => Err(format!(
                "unknown data kind '{other}'. Valid: split, div, intraday"
            )),
        }
    }
}

/// Intraday bar interval supported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BarInterval {
    #[default]
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
}

impl BarInterval {
    /// Value of the provider's `interval` query parameter.
    pub fn as_param(self) -> &'static str {
        match self {
            BarInterval::OneMinute => "1m",
            BarInterval::FiveMinutes => "5m",
        }
    }

    /// Gap between one chunk's end and the next chunk's start.
    ///
    /// The provider's `to` bound is inclusive, so the next chunk must start
    /// past it: one second for 1m timestamp ranges, one bar for 5m ranges.
    pub fn chunk_step(self) -> TimeDelta {
        match self {
            BarInterval::OneMinute => TimeDelta::seconds(1),
            BarInterval::FiveMinutes => TimeDelta::minutes(5),
        }
    }
}

impl FromStr for BarInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(BarInterval::OneMinute),
            "5m" => Ok(BarInterval::FiveMinutes),
            other => Err(format!("unknown interval '{other}'. Valid: 1m, 5m")),
        }
    }
}
