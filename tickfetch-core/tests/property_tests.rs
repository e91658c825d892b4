//! Property tests for chunking and adjustment invariants.
//!
//! Uses proptest to verify:
//! 1. Chunk coverage: chunks start at `start`, reach `end` to within one step,
//!    are separated by exactly one step, and never span more than the window
//! 2. Neutral adjustment: no splits and no dividends leaves prices unchanged
//! 3. Single split: bars before the split date are divided by the ratio
//! 4. Single dividend: bars before the dividend date drop by its value

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use proptest::prelude::*;
use tickfetch_core::adjust::{adjust_bars, market_date};
use tickfetch_core::data::chunk_range;
use tickfetch_core::domain::{Bar, DividendEvent, SplitEvent};

// ── Strategies (proptest) ────────────────────────────────────────────

/// 2015-01-01 .. 2025-01-01 in seconds.
fn arb_instant() -> impl Strategy<Value = i64> {
    1_420_070_400_i64..1_735_689_600_i64
}

fn arb_price() -> impl Strategy<Value = f64> {
    (1.0..1000.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

/// Minute bars at trading-day hours, one per day over `n` days.
fn arb_bars() -> impl Strategy<Value = Vec<Bar>> {
    prop::collection::vec(arb_price(), 1..60).prop_map(|closes| {
        let base = 1_704_207_600_i64; // 2024-01-02 15:00 UTC
        closes
            .into_iter()
            .enumerate()
            .map(|(i, close)| {
                let ts = base + i as i64 * 86_400;
                Bar {
                    timestamp: ts,
                    datetime: DateTime::from_timestamp(ts, 0).unwrap(),
                    open: close,
                    high: close * 1.01,
                    low: close * 0.99,
                    close,
                    volume: 1_000.0,
                }
            })
            .collect()
    })
}

fn dt(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap()
}

// ── 1. Chunk coverage ────────────────────────────────────────────────

proptest! {
    #[test]
    fn chunks_cover_range_contiguously(
        start in arb_instant(),
        span in 1_i64..(3 * 365 * 86_400),
        window_days in 1_i64..200,
        five_minute in any::<bool>(),
    ) {
        let end = start + span;
        let window = TimeDelta::days(window_days);
        let step = if five_minute { TimeDelta::minutes(5) } else { TimeDelta::seconds(1) };

        let chunks: Vec<_> = chunk_range(dt(start), dt(end), window, step).collect();

        prop_assert!(!chunks.is_empty());
        prop_assert_eq!(chunks[0].start, dt(start));
        // Any tail left uncovered is at most one boundary step.
        let last = chunks.last().unwrap();
        prop_assert!(last.end <= dt(end));
        prop_assert!(dt(end) - last.end <= step);
        for c in &chunks {
            prop_assert!(c.start <= c.end);
            prop_assert!(c.end - c.start <= window);
        }
        for pair in chunks.windows(2) {
            prop_assert_eq!(pair[1].start - pair[0].end, step);
        }
    }
}

// ── 2. Neutral adjustment ────────────────────────────────────────────

proptest! {
    #[test]
    fn no_actions_leaves_prices_unchanged(bars in arb_bars()) {
        let adjusted = adjust_bars(&bars, &[], &[]).unwrap();
        prop_assert_eq!(adjusted.len(), bars.len());
        for (raw, adj) in bars.iter().zip(&adjusted) {
            prop_assert_eq!(adj.open, raw.open);
            prop_assert_eq!(adj.close, raw.close);
            prop_assert_eq!(adj.volume, raw.volume);
            prop_assert_eq!(adj.split_factor, 1.0);
            prop_assert_eq!(adj.dividend_amount, 0.0);
        }
    }
}

// ── 3. Single split ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn single_split_divides_earlier_bars(
        bars in arb_bars(),
        offset in 0_i64..60,
        ratio in prop::sample::select(vec![2.0, 3.0, 4.0, 10.0, 0.5, 0.1]),
    ) {
        let split_date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap() + TimeDelta::days(offset);
        let splits = [SplitEvent { date: split_date, ratio }];
        let adjusted = adjust_bars(&bars, &splits, &[]).unwrap();

        for (raw, adj) in bars.iter().zip(&adjusted) {
            if market_date(raw.timestamp).unwrap() < split_date {
                prop_assert!((adj.close - raw.close / ratio).abs() < 1e-9);
                prop_assert!((adj.high - raw.high / ratio).abs() < 1e-9);
                prop_assert!((adj.volume - raw.volume * ratio).abs() < 1e-9);
            } else {
                prop_assert_eq!(adj.close, raw.close);
                prop_assert_eq!(adj.volume, raw.volume);
            }
        }
    }
}

// ── 4. Single dividend ───────────────────────────────────────────────

proptest! {
    #[test]
    fn single_dividend_reduces_earlier_bars(
        bars in arb_bars(),
        offset in 0_i64..60,
        value in 0.01..5.0_f64,
    ) {
        let div_date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap() + TimeDelta::days(offset);
        let dividends = [DividendEvent { date: div_date, value }];
        let adjusted = adjust_bars(&bars, &[], &dividends).unwrap();

        for (raw, adj) in bars.iter().zip(&adjusted) {
            if market_date(raw.timestamp).unwrap() < div_date {
                prop_assert!((adj.low - (raw.low - value)).abs() < 1e-9);
                prop_assert!((adj.close - (raw.close - value)).abs() < 1e-9);
            } else {
                prop_assert_eq!(adj.close, raw.close);
            }
            prop_assert_eq!(adj.volume, raw.volume);
        }
    }
}
