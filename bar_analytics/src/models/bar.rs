//! In-memory bar shapes used at the engine boundary.
//!
//! [`RawBar`] is what the acquisition side hands to
//! [`BarStore::append`](crate::store::BarStore::append); [`Bar`] is what the
//! aggregator hands back after collapsing a row range.

use std::fmt;

use chrono::NaiveDateTime;

/// A single minute observation (OHLCV) as delivered by the feed.
///
/// The timestamp is session wall-clock time; timezone resolution happens
/// upstream (see [`crate::tz`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawBar {
    /// Bar open time in the session timezone.
    pub timestamp: NaiveDateTime,

    /// Opening price.
    pub open: f64,

    /// Highest price during the bar interval.
    pub high: f64,

    /// Lowest price during the bar interval.
    pub low: f64,

    /// Closing price.
    pub close: f64,

    /// Volume traded during the bar interval.
    pub volume: f64,

    /// Volume-weighted average price. Not all feeds supply this.
    pub vwap: Option<f64>,
}

impl RawBar {
    pub fn new(
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            vwap: None,
        }
    }

    pub fn with_vwap(mut self, vwap: f64) -> Self {
        self.vwap = Some(vwap);
        self
    }
}

/// An aggregated bar covering a contiguous range of store rows.
///
/// `end` is exclusive-style: one minute past the last included row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// VWAP of the last included row, as stored in the `"vwap"` column.
    pub vwap: f64,
}

impl Bar {
    /// High minus low.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

impl fmt::Display for Bar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}  o={:.2} h={:.2} l={:.2} c={:.2} v={} vwap={:.2}",
            self.start.format("%Y-%m-%d %H:%M"),
            self.end.format("%Y-%m-%d %H:%M"),
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
            self.vwap
        )
    }
}
