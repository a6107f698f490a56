//! Trading-session indexing.
//!
//! A session is a run of rows with no gap larger than
//! [`SessionConfig::gap_minutes`]. Inside each session the EU and RTH
//! sub-windows sit at fixed minute offsets from the session's first bar,
//! calibrated for an 18:00 overnight open: +540 is 03:00 (EU), +930 is 09:30
//! (RTH open) and +1319 is 15:59 (last RTH minute).
//!
//! Offsets are resolved against wall-clock time, not row counts, so a missing
//! minute inside a session does not shift the windows. On gap-free minute
//! data the two agree.

use std::collections::BTreeMap;

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::{
    aggregate::aggregate,
    errors::EngineError,
    models::{Bar, IndexEntry},
    store::{BarStore, VWAP},
};

/// Gap used when only contiguous minute runs matter (first-bar detection).
pub const FIRST_BAR_GAP_MINUTES: i64 = 1;

/// Session boundary and sub-window offsets, all in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// A gap strictly longer than this starts a new session.
    pub gap_minutes: i64,
    pub eu_offset_minutes: i64,
    pub rth_start_offset_minutes: i64,
    /// Offset of the last RTH bar (inclusive).
    pub rth_end_offset_minutes: i64,
    /// Length of the opening-hour window used for the `H1` levels.
    pub first_hour_minutes: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            gap_minutes: 30,
            eu_offset_minutes: 540,
            rth_start_offset_minutes: 930,
            rth_end_offset_minutes: 1319,
            first_hour_minutes: 60,
        }
    }
}

/// Rows that begin a new segment: row 0 plus every row whose gap to the
/// previous row exceeds `gap_minutes`.
pub fn segment_starts(timestamps: &[NaiveDateTime], gap_minutes: i64) -> Vec<usize> {
    if timestamps.is_empty() {
        return Vec::new();
    }
    let gap = TimeDelta::minutes(gap_minutes);
    let mut starts = vec![0];
    starts.extend(
        timestamps
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| pair[1] - pair[0] > gap)
            .map(|(i, _)| i + 1),
    );
    starts
}

/// Inclusive `(start, end)` row bounds of every segment.
pub fn segments(timestamps: &[NaiveDateTime], gap_minutes: i64) -> Vec<(usize, usize)> {
    let starts = segment_starts(timestamps, gap_minutes);
    starts
        .iter()
        .enumerate()
        .map(|(k, &start)| {
            let end = starts
                .get(k + 1)
                .map_or(timestamps.len() - 1, |&next| next - 1);
            (start, end)
        })
        .collect()
}

/// Partition the rows into sessions and locate their sub-windows.
///
/// A pure function of `timestamps`: rebuilding on the same rows yields the
/// same entries.
pub fn build_index(timestamps: &[NaiveDateTime], config: &SessionConfig) -> Vec<IndexEntry> {
    segments(timestamps, config.gap_minutes)
        .into_iter()
        .map(|(start, end)| index_segment(timestamps, start, end, config))
        .collect()
}

fn index_segment(
    timestamps: &[NaiveDateTime],
    start: usize,
    end: usize,
    config: &SessionConfig,
) -> IndexEntry {
    let rows = &timestamps[start..=end];
    let first = rows[0];
    let last = rows[rows.len() - 1];
    let target = |offset: i64| first + TimeDelta::minutes(offset);
    let reaches = |offset: i64| last >= target(offset);
    // first row at or after the offset
    let at_or_after = |offset: i64| start + rows.partition_point(|t| *t < target(offset));
    // last row at or before the offset; none when the offset precedes the first row
    let at_or_before = |offset: i64| {
        rows.partition_point(|t| *t <= target(offset))
            .checked_sub(1)
            .map(|p| start + p)
    };

    let rth_start = reaches(config.rth_start_offset_minutes)
        .then(|| at_or_after(config.rth_start_offset_minutes));
    let rth_end = reaches(config.rth_end_offset_minutes)
        .then(|| at_or_before(config.rth_end_offset_minutes))
        .flatten()
        .filter(|&e| rth_start.is_some_and(|s| e >= s));

    let eu_start = reaches(config.eu_offset_minutes)
        .then(|| at_or_after(config.eu_offset_minutes));
    let eu_end = eu_start.and_then(|_| match rth_start {
        Some(r) => r.checked_sub(1),
        None => Some(end),
    });
    let (eu_start, eu_end) = match (eu_start, eu_end) {
        (Some(s), Some(e)) if s <= e => (Some(s), Some(e)),
        _ => (None, None),
    };

    let trade_date = match rth_start {
        Some(r) => timestamps[r].date(),
        None => first.date().succ_opt().unwrap_or(first.date()),
    };

    IndexEntry {
        trade_date,
        start,
        end,
        eu_start,
        eu_end,
        rth_start,
        rth_end,
        is_complete: rth_end.is_some(),
    }
}

/// Integer price key: the price rounded to the nearest cent, in cents.
pub fn price_key(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

/// Price-ordered map of reference levels for one session.
///
/// Keys come from [`price_key`]; labels landing on the same key are joined
/// with `", "` in the order they were produced. Iterate with `.iter().rev()`
/// for highest-first display.
///
/// Requires the `"vwap"` column.
pub fn make_messages(
    store: &BarStore,
    entry: &IndexEntry,
    previous: Option<&IndexEntry>,
    config: &SessionConfig,
) -> Result<BTreeMap<i64, String>, EngineError> {
    let vwap = store.column(VWAP)?;
    let mut levels: Vec<(f64, &'static str)> = Vec::new();

    let session = aggregate(store, entry.start, entry.end as isize)?;
    levels.push((session.open, "glbx open"));
    levels.push((session.high, "glbx hi"));
    levels.push((session.low, "glbx lo"));

    if let Some(eu) = entry.eu_rows() {
        let bar = aggregate(store, *eu.start(), *eu.end() as isize)?;
        levels.push((bar.open, "eu open"));
        levels.push((bar.high, "eu hi"));
        levels.push((bar.low, "eu lo"));
    }

    if let Some(rth_start) = entry.rth_start {
        let rth_last = entry.rth_end.unwrap_or(entry.end);
        // validates rth_start..=rth_last before it is sliced below
        let rth = aggregate(store, rth_start, rth_last as isize)?;
        let h1_last = first_hour_end(store, rth_start, rth_last, config.first_hour_minutes);
        let h1 = aggregate(store, rth_start, h1_last as isize)?;
        levels.push((rth.open, "rth open"));
        levels.push((h1.high, "H1 hi"));
        levels.push((h1.low, "H1 lo"));
        levels.push((rth.high, "rth hi"));
        levels.push((rth.low, "rth lo"));
    }

    levels.push((vwap[entry.end], "vwap"));

    if let Some(prev) = previous {
        let bar = previous_reference(store, prev)?;
        levels.push((bar.high, "pd hi"));
        levels.push((bar.low, "pd lo"));
        levels.push((bar.close, "pd close"));
        levels.push((bar.vwap, "pd vwap"));
    }

    let mut messages: BTreeMap<i64, String> = BTreeMap::new();
    for (price, label) in levels {
        if !price.is_finite() {
            continue;
        }
        messages
            .entry(price_key(price))
            .and_modify(|text| {
                text.push_str(", ");
                text.push_str(label);
            })
            .or_insert_with(|| label.to_string());
    }
    Ok(messages)
}

fn first_hour_end(store: &BarStore, rth_start: usize, rth_last: usize, minutes: i64) -> usize {
    let cutoff = store.timestamps()[rth_start] + TimeDelta::minutes(minutes);
    let window = &store.timestamps()[rth_start..=rth_last];
    rth_start + window.partition_point(|t| *t < cutoff).max(1) - 1
}

/// The previous session's RTH bar when it completed, else its full bar.
fn previous_reference(store: &BarStore, prev: &IndexEntry) -> Result<Bar, EngineError> {
    match prev.rth_rows() {
        Some(rth) => aggregate(store, *rth.start(), *rth.end() as isize),
        None => aggregate(store, prev.start, prev.end as isize),
    }
}
