//! EODHD data provider.
//!
//! Fetches splits, dividends and intraday bars from the EODHD REST API with a
//! blocking HTTP client, plus exchange symbol lists and historical index
//! constituents. Rate limiting is handled with a fixed cooldown on
//! HTTP 429 and a fixed courtesy delay between intraday chunk requests.
//!
//! Intraday requests are split into provider-sized windows and fetched
//! sequentially. A failed chunk is logged and skipped; an invalid API token
//! aborts the ticker immediately.

use chrono::{NaiveDate, TimeDelta};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::assemble::{assemble_intraday, parse_intraday_records, RawIntradayRecord};
use super::chunk::{chunk_range, Chunk};
use super::provider::{Dataset, FetchError, FetchRange, MarketDataProvider};
use crate::domain::{Bar, DividendEvent, ExchangeSymbol, IndexConstituent, SplitRecord};
use crate::kind::{BarInterval, DataKind};

pub const DEFAULT_BASE_URL: &str = "https://eodhd.com/api";

/// Body text the provider returns for a bad or missing token.
pub const INVALID_TOKEN_MARKER: &str = "Valid API token";

const BODY_SNIPPET_LEN: usize = 200;

/// Fundamentals section holding an index's dated member snapshots.
pub const HISTORICAL_COMPONENTS: &str = "HistoricalComponents";

/// Tunables for [`EodhdClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Timeout for a single HTTP call.
    pub request_timeout: Duration,
    /// Pause between consecutive chunk requests for one ticker.
    pub inter_request_delay: Duration,
    /// Sleep after an HTTP 429 before retrying the same request.
    pub rate_limit_cooldown: Duration,
    /// `None` retries 429 responses forever.
    pub max_rate_limit_retries: Option<u32>,
    /// Largest span one intraday request may cover.
    pub chunk_window: TimeDelta,
    pub interval: BarInterval,
    /// Dividend date fields, tried in order.
    pub dividend_date_fields: Vec<String>,
    pub dividend_value_field: String,
    pub invalid_token_marker: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            inter_request_delay: Duration::from_millis(200),
            rate_limit_cooldown: Duration::from_secs(60),
            max_rate_limit_retries: None,
            chunk_window: TimeDelta::days(100),
            interval: BarInterval::OneMinute,
            dividend_date_fields: vec!["recordDate".to_string(), "date".to_string()],
            dividend_value_field: "unadjustedValue".to_string(),
            invalid_token_marker: INVALID_TOKEN_MARKER.to_string(),
        }
    }
}

/// Decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// JSON array: the normal data response.
    Records(Vec<Value>),
    /// JSON object: the provider's error envelope.
    Object(Map<String, Value>),
    /// Anything that is not a JSON array or object.
    Text(String),
}

impl Payload {
    pub fn from_body(body: String) -> Self {
        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Array(values)) => Payload::Records(values),
            Ok(Value::Object(map)) => Payload::Object(map),
            _ => Payload::Text(body),
        }
    }
}

/// EODHD API client. Holds the HTTP session and the access token.
pub struct EodhdClient {
    http: reqwest::blocking::Client,
    token: String,
    config: ClientConfig,
}

impl EodhdClient {
    pub fn new(token: impl Into<String>, config: ClientConfig) -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            token: token.into(),
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GET `{base_url}/{endpoint}` with the token and `fmt=json` appended.
    ///
    /// HTTP 429 sleeps for the cooldown and retries the same request.
    /// Other non-2xx statuses and transport failures are returned as errors.
    pub fn request(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Payload, FetchError> {
        let url = format!("{}/{endpoint}", self.config.base_url.trim_end_matches('/'));
        let mut query = params.to_vec();
        query.push(("api_token", self.token.clone()));
        query.push(("fmt", "json".to_string()));

        let mut rate_limited: u32 = 0;
        loop {
            let resp = self
                .http
                .get(&url)
                .query(&query)
                .send()
                .map_err(|e| FetchError::Transport(e.without_url().to_string()))?;
            let status = resp.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                rate_limited += 1;
                if let Some(max) = self.config.max_rate_limit_retries {
                    if rate_limited > max {
                        return Err(FetchError::RateLimited {
                            attempts: rate_limited,
                        });
                    }
                }
                warn!(
                    endpoint,
                    attempt = rate_limited,
                    cooldown_secs = self.config.rate_limit_cooldown.as_secs_f64(),
                    "rate limit reached, sleeping"
                );
                std::thread::sleep(self.config.rate_limit_cooldown);
                continue;
            }

            let body = resp
                .text()
                .map_err(|e| FetchError::Transport(e.without_url().to_string()))?;

            if status == StatusCode::UNAUTHORIZED
                || (!status.is_success() && body.contains(&self.config.invalid_token_marker))
            {
                return Err(FetchError::InvalidCredential(snippet(&body)));
            }
            if !status.is_success() {
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    body: snippet(&body),
                });
            }

            return Ok(Payload::from_body(body));
        }
    }

    /// Unwrap a payload expected to be a JSON array.
    fn expect_records(&self, payload: Payload) -> Result<Vec<Value>, FetchError> {
        match payload {
            Payload::Records(values) => Ok(values),
            Payload::Object(map) => Err(FetchError::Provider(Value::Object(map).to_string())),
            Payload::Text(text) if text.contains(&self.config.invalid_token_marker) => {
                Err(FetchError::InvalidCredential(snippet(&text)))
            }
            Payload::Text(text) => Err(FetchError::MalformedPayload(snippet(&text))),
        }
    }

    /// Fetch one intraday window.
    pub fn fetch_intraday_chunk(
        &self,
        ticker: &str,
        chunk: &Chunk,
    ) -> Result<Vec<RawIntradayRecord>, FetchError> {
        let payload = self.request(
            &format!("{}/{ticker}", DataKind::Intraday.descriptor().endpoint),
            &[
                ("interval", self.config.interval.as_param().to_string()),
                ("from", chunk.from_ts().to_string()),
                ("to", chunk.to_ts().to_string()),
            ],
        )?;
        parse_intraday_records(self.expect_records(payload)?)
    }

    /// Fetch intraday bars over the whole range, chunk by chunk.
    ///
    /// Chunks run sequentially with `inter_request_delay` between them.
    /// Failed chunks are logged and skipped; an invalid token stops the loop
    /// and fails the ticker.
    pub fn fetch_intraday(&self, ticker: &str, range: &FetchRange) -> Result<Vec<Bar>, FetchError> {
        let chunks = chunk_range(
            range.start_utc(),
            range.end_utc(),
            self.config.chunk_window,
            self.config.interval.chunk_step(),
        );

        let mut pieces = Vec::new();
        for (i, chunk) in chunks.enumerate() {
            if i > 0 {
                std::thread::sleep(self.config.inter_request_delay);
            }
            info!(
                ticker,
                from = %chunk.start,
                to = %chunk.end,
                "querying intraday data"
            );

            match self.fetch_intraday_chunk(ticker, &chunk) {
                Ok(records) => {
                    debug!(ticker, rows = records.len(), "intraday chunk received");
                    pieces.push(records);
                }
                Err(FetchError::InvalidCredential(msg)) => {
                    warn!(ticker, "API token rejected, aborting remaining chunks");
                    return Err(FetchError::InvalidCredential(msg));
                }
                Err(e) => {
                    warn!(ticker, from = %chunk.start, error = %e, "skipping intraday chunk");
                }
            }
        }

        assemble_intraday(pieces)
    }

    /// Fetch split events between two dates.
    pub fn fetch_splits(&self, ticker: &str, range: &FetchRange) -> Result<Vec<SplitRecord>, FetchError> {
        let payload = self.request(
            &format!("{}/{ticker}", DataKind::Splits.descriptor().endpoint),
            &date_params(range),
        )?;
        self.expect_records(payload)?
            .into_iter()
            .map(|v| {
                serde_json::from_value(v)
                    .map_err(|e| FetchError::MalformedPayload(format!("split record: {e}")))
            })
            .collect()
    }

    /// Fetch dividend events between two dates.
    pub fn fetch_dividends(
        &self,
        ticker: &str,
        range: &FetchRange,
    ) -> Result<Vec<DividendEvent>, FetchError> {
        let payload = self.request(
            &format!("{}/{ticker}", DataKind::Dividends.descriptor().endpoint),
            &date_params(range),
        )?;
        self.expect_records(payload)?
            .iter()
            .map(|v| self.parse_dividend(v))
            .collect()
    }

    fn parse_dividend(&self, record: &Value) -> Result<DividendEvent, FetchError> {
        let date = self
            .config
            .dividend_date_fields
            .iter()
            .find_map(|field| record.get(field).and_then(Value::as_str))
            .ok_or_else(|| {
                FetchError::MalformedPayload(format!(
                    "dividend record has none of {:?}: {record}",
                    self.config.dividend_date_fields
                ))
            })?;
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| FetchError::MalformedPayload(format!("dividend date '{date}': {e}")))?;

        let field = &self.config.dividend_value_field;
        let value = match record.get(field) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| {
            FetchError::MalformedPayload(format!("dividend record missing numeric '{field}'"))
        })?;

        Ok(DividendEvent { date, value })
    }

    /// List every symbol on an exchange, optionally including delisted ones.
    pub fn fetch_exchange_symbols(
        &self,
        exchange: &str,
        include_delisted: bool,
    ) -> Result<Vec<ExchangeSymbol>, FetchError> {
        let mut params = Vec::new();
        if include_delisted {
            params.push(("delisted", "1".to_string()));
        }
        let payload = self.request(&format!("exchange-symbol-list/{exchange}"), &params)?;
        let symbols = self
            .expect_records(payload)?
            .into_iter()
            .map(|v| {
                serde_json::from_value(v)
                    .map_err(|e| FetchError::MalformedPayload(format!("symbol record: {e}")))
            })
            .collect::<Result<Vec<ExchangeSymbol>, _>>()?;
        info!(exchange, count = symbols.len(), "retrieved exchange symbols");
        Ok(symbols)
    }
}

impl EodhdClient {
    /// Historical members of an index between two dates.
    ///
    /// Returns `Ok(None)` when the provider has no historical components
    /// for the index; not every index supports them.
    pub fn fetch_historical_constituents(
        &self,
        index: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Option<Vec<IndexConstituent>>, FetchError> {
        let payload = self.request(
            &format!("fundamentals/{index}"),
            &[
                ("historical", "1".to_string()),
                ("from", from.format("%Y-%m-%d").to_string()),
                ("to", to.format("%Y-%m-%d").to_string()),
            ],
        )?;

        let section = match payload {
            Payload::Object(mut map) => map.remove(HISTORICAL_COMPONENTS),
            other => {
                // Surfaces token and garbage bodies; an array has no sections.
                self.expect_records(other)?;
                None
            }
        };

        let members = match section {
            Some(Value::Object(snapshots)) if !snapshots.is_empty() => {
                flatten_components(&snapshots)?
            }
            _ => Vec::new(),
        };
        if members.is_empty() {
            warn!(index, "no historical components found");
            return Ok(None);
        }
        info!(index, count = members.len(), "retrieved historical constituents");
        Ok(Some(members))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawComponent {
    code: String,
    exchange: Option<String>,
    name: Option<String>,
    sector: Option<String>,
    industry: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

/// Flatten `{date: {key: member}}` or `{date: [member, ...]}` into rows.
pub fn flatten_components(
    snapshots: &Map<String, Value>,
) -> Result<Vec<IndexConstituent>, FetchError> {
    let mut rows = Vec::new();
    for (date, members) in snapshots {
        let members: Vec<&Value> = match members {
            Value::Object(map) => map.values().collect(),
            Value::Array(list) => list.iter().collect(),
            other => {
                debug!(date = %date, value = %other, "skipping non-collection snapshot");
                continue;
            }
        };
        for member in members {
            let raw = RawComponent::deserialize(member).map_err(|e| {
                FetchError::MalformedPayload(format!("component on {date}: {e}"))
            })?;
            let ticker = match raw.exchange.as_deref() {
                Some(exchange) if !exchange.is_empty() && !raw.code.contains('.') => {
                    format!("{}.{exchange}", raw.code)
                }
                _ => raw.code.clone(),
            };
            rows.push(IndexConstituent {
                date: date.clone(),
                ticker,
                code: raw.code,
                exchange: raw.exchange,
                name: raw.name,
                sector: raw.sector,
                industry: raw.industry,
                start_date: raw.start_date,
                end_date: raw.end_date,
            });
        }
    }
    Ok(rows)
}

impl MarketDataProvider for EodhdClient {
    fn name(&self) -> &str {
        "eodhd"
    }

    fn fetch(
        &self,
        kind: DataKind,
        ticker: &str,
        range: &FetchRange,
    ) -> Result<Dataset, FetchError> {
        match kind {
            DataKind::Splits => self.fetch_splits(ticker, range).map(Dataset::Splits),
            DataKind::Dividends => self.fetch_dividends(ticker, range).map(Dataset::Dividends),
            DataKind::Intraday => self.fetch_intraday(ticker, range).map(Dataset::Intraday),
        }
    }
}

fn date_params(range: &FetchRange) -> [(&'static str, String); 2] {
    [
        ("from", range.start.format("%Y-%m-%d").to_string()),
        ("to", range.end.format("%Y-%m-%d").to_string()),
    ]
}

fn snippet(text: &str) -> String {
    text.chars().take(BODY_SNIPPET_LEN).collect()
}
