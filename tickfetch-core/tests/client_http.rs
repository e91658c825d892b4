//! EODHD client against a local mock server.
//!
//! Covers chunked intraday requests, chunk-level error isolation, token
//! abort, 429 cooldown retries, the courtesy delay between chunks, and the
//! split/dividend/symbol/constituent endpoints.

use chrono::{NaiveDate, TimeDelta};
use httpmock::prelude::*;
use serde_json::json;
use std::thread;
use std::time::{Duration, Instant};
use tickfetch_core::data::{ClientConfig, Dataset, EodhdClient, FetchError, FetchRange};
use tickfetch_core::{DataKind, MarketDataProvider};

const JAN_1_2024: i64 = 1_704_067_200;
const DAY: i64 = 86_400;

fn test_config(server: &MockServer) -> ClientConfig {
    ClientConfig {
        base_url: server.base_url(),
        inter_request_delay: Duration::ZERO,
        rate_limit_cooldown: Duration::from_millis(1),
        chunk_window: TimeDelta::days(2),
        ..ClientConfig::default()
    }
}

fn client(server: &MockServer) -> EodhdClient {
    EodhdClient::new("test-token", test_config(server)).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Jan 1 to Jan 5 with a 2-day window: two chunks.
fn two_chunk_range() -> FetchRange {
    FetchRange::new(date(2024, 1, 1), date(2024, 1, 5))
}

fn bar_json(ts: i64, close: f64) -> serde_json::Value {
    json!({"timestamp": ts, "gmtoffset": 0, "o": close, "h": close, "l": close, "c": close, "v": 10})
}

#[test]
fn intraday_requests_each_chunk_once() {
    let server = MockServer::start();
    let first = server.mock(|when, then| {
        when.method(GET)
            .path("/intraday/AAPL.US")
            .query_param("api_token", "test-token")
            .query_param("fmt", "json")
            .query_param("interval", "1m")
            .query_param("from", JAN_1_2024.to_string())
            .query_param("to", (JAN_1_2024 + 2 * DAY).to_string());
        then.status(200)
            .json_body(json!([bar_json(JAN_1_2024 + 60, 1.0), bar_json(JAN_1_2024, 0.5)]));
    });
    let second = server.mock(|when, then| {
        when.method(GET)
            .path("/intraday/AAPL.US")
            .query_param("from", (JAN_1_2024 + 2 * DAY + 1).to_string())
            .query_param("to", (JAN_1_2024 + 4 * DAY).to_string());
        then.status(200)
            .json_body(json!([bar_json(JAN_1_2024 + 3 * DAY, 2.0)]));
    });

    let bars = client(&server)
        .fetch_intraday("AAPL.US", &two_chunk_range())
        .unwrap();

    first.assert_hits(1);
    second.assert_hits(1);
    let ts: Vec<i64> = bars.iter().map(|b| b.timestamp).collect();
    assert_eq!(ts, vec![JAN_1_2024, JAN_1_2024 + 60, JAN_1_2024 + 3 * DAY]);
}

#[test]
fn failed_chunk_is_skipped() {
    let server = MockServer::start();
    let good = server.mock(|when, then| {
        when.path("/intraday/MSFT.US")
            .query_param("from", JAN_1_2024.to_string());
        then.status(200).json_body(json!([bar_json(JAN_1_2024, 5.0)]));
    });
    let bad = server.mock(|when, then| {
        when.path("/intraday/MSFT.US")
            .query_param("from", (JAN_1_2024 + 2 * DAY + 1).to_string());
        then.status(500).body("internal error");
    });

    let bars = client(&server)
        .fetch_intraday("MSFT.US", &two_chunk_range())
        .unwrap();

    good.assert_hits(1);
    bad.assert_hits(1);
    assert_eq!(bars.len(), 1);
    assert_eq!(bars[0].close, 5.0);
}

#[test]
fn error_object_chunk_is_skipped() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.path("/intraday/IBM.US");
        then.status(200)
            .json_body(json!({"status": "Error", "message": "ticker not found"}));
    });

    let bars = client(&server)
        .fetch_intraday("IBM.US", &two_chunk_range())
        .unwrap();

    mock.assert_hits(2);
    assert!(bars.is_empty());
}

#[test]
fn invalid_token_aborts_remaining_chunks() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.path("/intraday/AAPL.US");
        then.status(200).body("Only Valid API token is allowed");
    });

    let err = client(&server)
        .fetch_intraday("AAPL.US", &two_chunk_range())
        .unwrap_err();

    mock.assert_hits(1);
    assert!(matches!(err, FetchError::InvalidCredential(_)));
}

#[test]
fn unauthorized_status_is_credential_error() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.path("/splits/AAPL.US");
        then.status(401).body("Unauthenticated");
    });

    let err = client(&server)
        .fetch_splits("AAPL.US", &two_chunk_range())
        .unwrap_err();

    mock.assert_hits(1);
    assert!(matches!(err, FetchError::InvalidCredential(_)));
}

#[test]
fn rate_limit_gives_up_after_cap() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.path("/div/AAPL.US");
        then.status(429).body("Too Many Requests");
    });

    let config = ClientConfig {
        max_rate_limit_retries: Some(2),
        ..test_config(&server)
    };
    let err = EodhdClient::new("test-token", config)
        .unwrap()
        .fetch_dividends("AAPL.US", &two_chunk_range())
        .unwrap_err();

    mock.assert_hits(3);
    assert!(matches!(err, FetchError::RateLimited { attempts: 3 }));
}

#[test]
fn rate_limit_then_success_returns_data() {
    let server = MockServer::start();
    let mut limited = server.mock(|when, then| {
        when.path("/div/AAPL.US");
        then.status(429).body("Too Many Requests");
    });

    let config = ClientConfig {
        rate_limit_cooldown: Duration::from_millis(500),
        max_rate_limit_retries: None,
        ..test_config(&server)
    };
    let client = EodhdClient::new("test-token", config).unwrap();

    let dividends = thread::scope(|scope| {
        let fetch = scope.spawn(|| client.fetch_dividends("AAPL.US", &two_chunk_range()));

        // Swap the 429 for a real answer while the client is cooling down.
        let waited = Instant::now();
        while limited.hits() == 0 {
            assert!(waited.elapsed() < Duration::from_secs(5), "no request arrived");
            thread::sleep(Duration::from_millis(5));
        }
        limited.delete();
        server.mock(|when, then| {
            when.path("/div/AAPL.US");
            then.status(200)
                .json_body(json!([{"date": "2024-01-03", "unadjustedValue": 0.5}]));
        });

        fetch.join().unwrap()
    })
    .unwrap();

    assert_eq!(dividends.len(), 1);
    assert_eq!(dividends[0].value, 0.5);
}

#[test]
fn courtesy_delay_between_chunks() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.path("/intraday/AAPL.US");
        then.status(200).json_body(json!([]));
    });

    // Jan 1 to Jan 7 with a 2-day window: three chunks, two pauses.
    let config = ClientConfig {
        inter_request_delay: Duration::from_millis(50),
        ..test_config(&server)
    };
    let started = Instant::now();
    EodhdClient::new("test-token", config)
        .unwrap()
        .fetch_intraday("AAPL.US", &FetchRange::new(date(2024, 1, 1), date(2024, 1, 7)))
        .unwrap();

    mock.assert_hits(3);
    assert!(started.elapsed() >= Duration::from_millis(100));
}

#[test]
fn first_chunk_is_not_delayed() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.path("/intraday/AAPL.US");
        then.status(200).json_body(json!([]));
    });

    let config = ClientConfig {
        inter_request_delay: Duration::from_secs(2),
        ..test_config(&server)
    };
    let started = Instant::now();
    EodhdClient::new("test-token", config)
        .unwrap()
        .fetch_intraday("AAPL.US", &FetchRange::new(date(2024, 1, 1), date(2024, 1, 2)))
        .unwrap();

    mock.assert_hits(1);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn other_status_is_reported() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.path("/splits/AAPL.US");
        then.status(404).body("Ticker Not Found.");
    });

    let err = client(&server)
        .fetch_splits("AAPL.US", &two_chunk_range())
        .unwrap_err();

    match err {
        FetchError::Status { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "Ticker Not Found.");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn splits_use_date_bounds() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/splits/NVDA.US")
            .query_param("from", "2021-01-01")
            .query_param("to", "2024-12-31");
        then.status(200).json_body(json!([
            {"date": "2021-07-20", "split": "4.000000/1.000000"},
            {"date": "2024-06-10", "split": "10.000000/1.000000"}
        ]));
    });

    let splits = client(&server)
        .fetch_splits("NVDA.US", &FetchRange::new(date(2021, 1, 1), date(2024, 12, 31)))
        .unwrap();

    mock.assert_hits(1);
    assert_eq!(splits.len(), 2);
    assert_eq!(splits[1].date, date(2024, 6, 10));
    assert_eq!(splits[1].parse().unwrap().ratio, 10.0);
}

#[test]
fn dividends_use_configured_fields() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.path("/div/AAPL.US");
        then.status(200).json_body(json!([
            {"date": "2024-02-09", "recordDate": "2024-02-12", "value": 0.24, "unadjustedValue": 0.24},
            {"date": "2024-05-10", "recordDate": "2024-05-13", "value": 0.25, "unadjustedValue": 0.25}
        ]));
    });

    let config = ClientConfig {
        dividend_date_fields: vec!["date".into()],
        dividend_value_field: "value".into(),
        ..test_config(&server)
    };
    let dividends = EodhdClient::new("test-token", config)
        .unwrap()
        .fetch_dividends("AAPL.US", &two_chunk_range())
        .unwrap();

    assert_eq!(dividends.len(), 2);
    assert_eq!(dividends[0].date, date(2024, 2, 9));
    assert_eq!(dividends[1].value, 0.25);
}

#[test]
fn exchange_symbols_include_delisted() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.path("/exchange-symbol-list/US")
            .query_param("delisted", "1");
        then.status(200).json_body(json!([
            {"Code": "AAPL", "Name": "Apple Inc", "Country": "USA", "Exchange": "NASDAQ",
             "Currency": "USD", "Type": "Common Stock", "Isin": "US0378331005"}
        ]));
    });

    let symbols = client(&server).fetch_exchange_symbols("US", true).unwrap();

    mock.assert_hits(1);
    assert_eq!(symbols[0].code, "AAPL");
    assert_eq!(symbols[0].kind.as_deref(), Some("Common Stock"));
}

#[test]
fn provider_dispatches_on_kind() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.path("/intraday/AAPL.US");
        then.status(200).json_body(json!([bar_json(JAN_1_2024, 1.0)]));
    });

    let provider: &dyn MarketDataProvider = &client(&server);
    let dataset = provider
        .fetch(DataKind::Intraday, "AAPL.US", &two_chunk_range())
        .unwrap();

    assert_eq!(provider.name(), "eodhd");
    assert!(matches!(dataset, Dataset::Intraday(ref bars) if bars.len() == 1));
}

#[test]
fn constituents_from_keyed_snapshots() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.path("/fundamentals/GSPC.INDX")
            .query_param("historical", "1")
            .query_param("from", "2020-01-01")
            .query_param("to", "2020-12-31");
        then.status(200).json_body(json!({
            "General": {"Code": "GSPC"},
            "HistoricalComponents": {
                "2020-01-01": {
                    "0": {"Code": "AAPL", "Exchange": "US", "Name": "Apple Inc"},
                    "1": {"Code": "MSFT", "Exchange": "US", "Name": "Microsoft"}
                }
            }
        }));
    });

    let members = client(&server)
        .fetch_historical_constituents("GSPC.INDX", date(2020, 1, 1), date(2020, 12, 31))
        .unwrap()
        .unwrap();

    mock.assert_hits(1);
    let tickers: Vec<&str> = members.iter().map(|m| m.ticker.as_str()).collect();
    assert_eq!(tickers, vec!["AAPL.US", "MSFT.US"]);
    assert!(members.iter().all(|m| m.date == "2020-01-01"));
}

#[test]
fn constituents_from_listed_snapshots() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.path("/fundamentals/IXIC.INDX");
        then.status(200).json_body(json!({
            "HistoricalComponents": {
                "2021-06-01": [
                    {"Code": "NVDA", "Name": "NVIDIA"},
                    {"Code": "AMD", "Name": "Advanced Micro Devices"}
                ],
                "2021-07-01": [
                    {"Code": "NVDA", "Name": "NVIDIA"}
                ]
            }
        }));
    });

    let members = client(&server)
        .fetch_historical_constituents("IXIC.INDX", date(2021, 1, 1), date(2021, 12, 31))
        .unwrap()
        .unwrap();

    assert_eq!(members.len(), 3);
    assert_eq!(members[2].date, "2021-07-01");
    assert_eq!(members[2].code, "NVDA");
    assert_eq!(members[1].name.as_deref(), Some("Advanced Micro Devices"));
}

#[test]
fn constituents_absent_section_is_none() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.path("/fundamentals/FTSE.INDX");
        then.status(200)
            .json_body(json!({"General": {"Code": "FTSE"}, "HistoricalComponents": {}}));
    });

    let members = client(&server)
        .fetch_historical_constituents("FTSE.INDX", date(2021, 1, 1), date(2021, 12, 31))
        .unwrap();
    assert!(members.is_none());
}
