//! Data acquisition: chunking, the EODHD client, intraday assembly.

pub mod assemble;
pub mod chunk;
pub mod eodhd;
pub mod provider;

pub use assemble::{assemble_intraday, parse_intraday_records, RawIntradayRecord};
pub use chunk::{chunk_range, Chunk, Chunks};
pub use eodhd::{flatten_components, ClientConfig, EodhdClient, Payload};
pub use provider::{Dataset, FetchError, FetchRange, MarketDataProvider};
