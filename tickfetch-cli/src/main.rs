//! Tickfetch CLI: download, adjust and symbol-list commands.
//!
//! Commands:
//! - `download <kind>`: fetch splits, dividends or intraday bars per ticker into CSV
//! - `adjust`: back-adjust stored intraday bars for splits and dividends
//! - `symbols`: save an exchange's symbol list
//! - `constituents`: save an index's historical members as a ticker list

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tickfetch_core::{DataKind, EodhdClient, FetchRange};
use tickfetch_runner::{
    adjust_batch, clean_tickers, download_batch, download_batch_parallel, is_valid_ticker,
    load_tickers, BatchOptions, BatchSummary, CsvStore, DownloadConfig, LogProgress,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_START: &str = "2021-01-01";

#[derive(Parser)]
#[command(
    name = "tickfetch",
    about = "Tickfetch CLI: EODHD market data downloader and adjuster"
)]
struct Cli {
    /// TOML config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory. Overrides the config's data_dir.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TickerArgs {
    /// Tickers to process (e.g., AAPL.US MSFT.US).
    #[arg(long, num_args = 1.., conflicts_with = "tickers_file")]
    tickers: Vec<String>,

    /// CSV file with a Ticker column.
    #[arg(long)]
    tickers_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download one data kind for every ticker; existing files are skipped.
    Download {
        /// Data kind: split, div or intraday.
        kind: DataKind,

        #[command(flatten)]
        tickers: TickerArgs,

        /// Start date (YYYY-MM-DD). Defaults to 2021-01-01.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Download tickers on a worker pool.
        #[arg(long, default_value_t = false)]
        parallel: bool,

        /// Worker threads for --parallel. Overrides the config's workers.
        #[arg(long)]
        workers: Option<usize>,

        /// API token. Defaults to the environment variable named by token_env.
        #[arg(long)]
        token: Option<String>,
    },
    /// Back-adjust stored intraday bars for splits and dividends.
    Adjust {
        #[command(flatten)]
        tickers: TickerArgs,

        /// Re-adjust tickers that already have an adjusted file.
        #[arg(long, default_value_t = false)]
        overwrite: bool,
    },
    /// Save an exchange's symbol list.
    Symbols {
        /// Exchange code.
        #[arg(long, default_value = "US")]
        exchange: String,

        /// Include delisted symbols.
        #[arg(long, default_value_t = false)]
        delisted: bool,

        /// API token. Defaults to the environment variable named by token_env.
        #[arg(long)]
        token: Option<String>,
    },
    /// Save an index's historical constituents as a CSV with a Ticker column.
    Constituents {
        /// Index symbol (e.g., GSPC.INDX for the S&P 500).
        #[arg(long, default_value = "GSPC.INDX")]
        index: String,

        /// Start date (YYYY-MM-DD). Defaults to 2021-01-01.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Exchange suffix appended to bare member codes.
        #[arg(long, default_value = "US")]
        suffix: String,

        /// API token. Defaults to the environment variable named by token_env.
        #[arg(long)]
        token: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => DownloadConfig::from_file(path)?,
        None => DownloadConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    match cli.command {
        Commands::Download {
            kind,
            tickers,
            start,
            end,
            parallel,
            workers,
            token,
        } => run_download(&config, kind, &tickers, start, end, parallel, workers, token),
        Commands::Adjust { tickers, overwrite } => run_adjust(&config, &tickers, overwrite),
        Commands::Symbols {
            exchange,
            delisted,
            token,
        } => run_symbols(&config, &exchange, delisted, token),
        Commands::Constituents {
            index,
            start,
            end,
            suffix,
            token,
        } => run_constituents(&config, &index, start, end, &suffix, token),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn resolve_tickers(args: &TickerArgs) -> Result<Vec<String>> {
    let tickers = match &args.tickers_file {
        Some(path) => load_tickers(path)
            .with_context(|| format!("loading tickers from {}", path.display()))?,
        None => clean_tickers(&args.tickers),
    };
    if tickers.is_empty() {
        bail!("no tickers given: pass --tickers or --tickers-file");
    }
    Ok(tickers)
}

fn parse_date(value: Option<&str>, fallback: NaiveDate) -> Result<NaiveDate> {
    match value {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD")),
        None => Ok(fallback),
    }
}

/// Parse `--start`/`--end`, defaulting to 2021-01-01 through today.
fn date_range(start: Option<String>, end: Option<String>) -> Result<(NaiveDate, NaiveDate)> {
    let default_start = NaiveDate::parse_from_str(DEFAULT_START, "%Y-%m-%d")?;
    let start = parse_date(start.as_deref(), default_start)?;
    let end = parse_date(end.as_deref(), chrono::Local::now().date_naive())?;
    if start > end {
        bail!("start date {start} is after end date {end}");
    }
    Ok((start, end))
}

fn build_client(config: &DownloadConfig, token: Option<String>) -> Result<EodhdClient> {
    let token = config.resolve_token(token)?;
    Ok(EodhdClient::new(token, config.client_config())?)
}

#[allow(clippy::too_many_arguments)]
fn run_download(
    config: &DownloadConfig,
    kind: DataKind,
    ticker_args: &TickerArgs,
    start: Option<String>,
    end: Option<String>,
    parallel: bool,
    workers: Option<usize>,
    token: Option<String>,
) -> Result<()> {
    let (start, end) = date_range(start, end)?;
    let tickers = resolve_tickers(ticker_args)?;
    let client = build_client(config, token)?;
    let store = CsvStore::new(&config.data_dir);
    let opts = BatchOptions {
        kind,
        range: FetchRange::new(start, end),
        empty_is_failure: config.empty_is_failure,
    };
    let progress = LogProgress::default();

    info!(
        "downloading {kind} for {} tickers, {start} to {end}, into {}",
        tickers.len(),
        config.data_dir.display()
    );

    let summary = if parallel {
        let workers = workers.unwrap_or(config.workers);
        download_batch_parallel(&client, &store, &tickers, &opts, workers, &progress)?
    } else {
        download_batch(&client, &store, &tickers, &opts, &progress)
    };

    exit_on_failures(&summary);
    Ok(())
}

fn run_adjust(config: &DownloadConfig, ticker_args: &TickerArgs, overwrite: bool) -> Result<()> {
    let tickers = resolve_tickers(ticker_args)?;
    let store = CsvStore::new(&config.data_dir);
    let summary = adjust_batch(&store, &tickers, overwrite);
    exit_on_failures(&summary);
    Ok(())
}

fn run_symbols(
    config: &DownloadConfig,
    exchange: &str,
    delisted: bool,
    token: Option<String>,
) -> Result<()> {
    let client = build_client(config, token)?;
    let symbols = client.fetch_exchange_symbols(exchange, delisted)?;
    if symbols.is_empty() {
        bail!("exchange {exchange}: 0 rows returned");
    }
    let store = CsvStore::new(&config.data_dir);
    let path = store.write_symbols(exchange, &symbols)?;
    println!("Saved {} symbols to {}", symbols.len(), path.display());
    Ok(())
}

fn run_constituents(
    config: &DownloadConfig,
    index: &str,
    start: Option<String>,
    end: Option<String>,
    suffix: &str,
    token: Option<String>,
) -> Result<()> {
    if !is_valid_ticker(index) {
        bail!("invalid index symbol '{index}'");
    }
    let (start, end) = date_range(start, end)?;
    let client = build_client(config, token)?;

    let Some(mut members) = client.fetch_historical_constituents(index, start, end)? else {
        bail!("no historical components for {index}; not every index supports them");
    };
    for member in &mut members {
        member.qualify(suffix);
    }

    let store = CsvStore::new(&config.data_dir);
    let path = store.write_constituents(index, &members)?;
    println!("Saved {} constituent rows to {}", members.len(), path.display());
    println!("Use it with: --tickers-file {}", path.display());
    Ok(())
}

fn exit_on_failures(summary: &BatchSummary) {
    println!(
        "{} saved, {} skipped, {} failed of {}",
        summary.saved.len(),
        summary.skipped.len(),
        summary.failures.len(),
        summary.total
    );
    if !summary.all_succeeded() {
        for (ticker, reason) in &summary.failures {
            eprintln!("Error for {ticker}: {reason}");
        }
        std::process::exit(1);
    }
}
