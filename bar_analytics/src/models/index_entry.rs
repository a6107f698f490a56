//! One trading session located inside a [`BarStore`](crate::store::BarStore).

use std::{fmt, ops::RangeInclusive};

use chrono::NaiveDate;

/// Row bounds of one trading session and its sub-windows.
///
/// All positions are inclusive row indexes into the store the entry was
/// built from. Sub-window bounds are `None` when the session did not run
/// long enough to reach them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Date the session trades into (RTH date, or first-row date + 1).
    pub trade_date: NaiveDate,
    pub start: usize,
    pub end: usize,
    pub eu_start: Option<usize>,
    pub eu_end: Option<usize>,
    pub rth_start: Option<usize>,
    pub rth_end: Option<usize>,
    /// True iff `rth_end` is present.
    pub is_complete: bool,
}

impl IndexEntry {
    /// Full-session rows.
    pub fn rows(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }

    pub fn row_count(&self) -> usize {
        self.end - self.start + 1
    }

    /// EU window rows when both bounds are known.
    pub fn eu_rows(&self) -> Option<RangeInclusive<usize>> {
        Some(self.eu_start?..=self.eu_end?)
    }

    /// RTH rows when the window has both opened and closed.
    pub fn rth_rows(&self) -> Option<RangeInclusive<usize>> {
        Some(self.rth_start?..=self.rth_end?)
    }
}

impl fmt::Display for IndexEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn span(a: Option<usize>, b: Option<usize>) -> String {
            match (a, b) {
                (Some(a), Some(b)) => format!("{a}..={b}"),
                (Some(a), None) => format!("{a}.."),
                _ => "-".to_string(),
            }
        }
        write!(
            f,
            "{}  glbx {}..={}  eu {}  rth {}{}",
            self.trade_date,
            self.start,
            self.end,
            span(self.eu_start, self.eu_end),
            span(self.rth_start, self.rth_end),
            if self.is_complete { "" } else { "  (partial)" }
        )
    }
}
