//! Collapsing row ranges into single bars.

use chrono::TimeDelta;
use indexmap::IndexMap;

use crate::{
    bucket::{Timeframe, bucket_id},
    errors::EngineError,
    models::{Bar, IndexEntry},
    store::{BarStore, VWAP},
};

/// Aggregates rows `start..=inclusive_end` into one [`Bar`].
///
/// A negative `inclusive_end` counts back from the row count, so `-1` is the
/// last row.
///
/// `vwap` is read from the `"vwap"` column at the last included row rather
/// than recomputed over the range. For a range starting at a session open
/// this is the range's VWAP; for any other range it covers a different span
/// than the OHLC fields.
pub fn aggregate(store: &BarStore, start: usize, inclusive_end: isize) -> Result<Bar, EngineError> {
    let len = store.len();
    let end = if inclusive_end < 0 {
        len as isize + inclusive_end
    } else {
        inclusive_end
    };
    if end < 0 || start as isize > end || end as usize >= len {
        return Err(EngineError::InvalidRange {
            start: start as i64,
            end: end as i64,
            len,
        });
    }
    let end = end as usize;
    let vwap = store.column(VWAP)?;
    let rows = start..=end;

    let high = store.high()[rows.clone()]
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let low = store.low()[rows.clone()]
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);

    Ok(Bar {
        start: store.timestamps()[start],
        end: store.timestamps()[end] + TimeDelta::minutes(1),
        open: store.open()[start],
        high,
        low,
        close: store.close()[end],
        volume: store.volume()[rows].iter().sum(),
        vwap: vwap[end],
    })
}

/// One bar per timeframe bucket, in chronological order.
pub fn aggregate_buckets(store: &BarStore, timeframe: Timeframe) -> Result<Vec<Bar>, EngineError> {
    let mut buckets: IndexMap<i64, (usize, usize)> = IndexMap::new();
    for (pos, ts) in store.timestamps().iter().enumerate() {
        buckets
            .entry(bucket_id(*ts, timeframe))
            .and_modify(|(_, end)| *end = pos)
            .or_insert((pos, pos));
    }
    buckets
        .into_values()
        .map(|(start, end)| aggregate(store, start, end as isize))
        .collect()
}

/// Full-session bars, one per index entry.
pub fn session_bars(store: &BarStore, index: &[IndexEntry]) -> Result<Vec<Bar>, EngineError> {
    index
        .iter()
        .map(|entry| aggregate(store, entry.start, entry.end as isize))
        .collect()
}

/// RTH bars for sessions whose RTH window both opened and closed.
pub fn rth_bars(store: &BarStore, index: &[IndexEntry]) -> Result<Vec<Bar>, EngineError> {
    index
        .iter()
        .filter_map(IndexEntry::rth_rows)
        .map(|rows| aggregate(store, *rows.start(), *rows.end() as isize))
        .collect()
}
