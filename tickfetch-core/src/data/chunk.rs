//! Date-range chunking under a provider window limit.
//!
//! The provider caps how many days one intraday request may span, so a long
//! range is split into consecutive windows. Each window ends at
//! `min(start + window, end)` and the next begins one `step` later, so the
//! provider's inclusive `to` bound is never requested twice.

use chrono::{DateTime, TimeDelta, Utc};

/// One sub-range of a chunked request. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Chunk {
    /// `from` query value (Unix seconds).
    pub fn from_ts(&self) -> i64 {
        self.start.timestamp()
    }

    /// `to` query value (Unix seconds).
    pub fn to_ts(&self) -> i64 {
        self.end.timestamp()
    }
}

/// Iterator over the chunks of `[start, end]`.
///
/// Pure function of its inputs; clone it to restart.
#[derive(Debug, Clone)]
pub struct Chunks {
    next_start: DateTime<Utc>,
    end: DateTime<Utc>,
    window: TimeDelta,
    step: TimeDelta,
}

impl Iterator for Chunks {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.next_start >= self.end {
            return None;
        }
        // Past chrono's representable range the window is clamped to `end`.
        let chunk_end = self
            .next_start
            .checked_add_signed(self.window)
            .map_or(self.end, |e| e.min(self.end));
        let chunk = Chunk {
            start: self.next_start,
            end: chunk_end,
        };
        self.next_start = chunk_end
            .checked_add_signed(self.step)
            .unwrap_or(self.end);
        Some(chunk)
    }
}

/// Split `[start, end]` into windows of at most `window`, separated by `step`.
///
/// An empty or inverted range yields no chunks. Non-positive `window` or
/// `step` values are clamped to one second so the iterator always advances.
pub fn chunk_range(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    window: TimeDelta,
    step: TimeDelta,
) -> Chunks {
    let min = TimeDelta::seconds(1);
    Chunks {
        next_start: start,
        end,
        window: window.max(min),
        step: step.max(min),
    }
}
