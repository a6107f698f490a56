//! Columnar bar store for one instrument.
//!
//! Rows are minute bars in session wall-clock time. The five OHLCV columns
//! are fixed fields with direct accessors; anything computed afterwards
//! (`"vwap"`, `"strat"`, z-scores, ...) lives in an insertion-ordered map of
//! derived columns. Every column always has exactly [`BarStore::len`] values.
//!
//! The store only grows. Selection and truncation go through
//! [`BarStore::slice`] and the range helpers, which copy instead of editing
//! in place.
//!
//! The session index is cached on the store and dropped on every append, so
//! a stale index can never be observed.

use std::ops::RangeInclusive;

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use indexmap::IndexMap;
use tracing::debug;

use crate::{
    derived::VwapAccumulator,
    errors::EngineError,
    models::{IndexEntry, RawBar},
    session::{SessionConfig, build_index},
    tz::{DstPolicy, from_session_time, to_session_time},
};

/// Name of the derived VWAP column.
pub const VWAP: &str = "vwap";
/// Name of the derived bar-type classification column.
pub const STRAT: &str = "strat";

/// Default gap (minutes) after which the running VWAP starts over.
pub const DEFAULT_VWAP_RESET_GAP_MINUTES: i64 = 30;

/// The fixed OHLCV columns every store carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseColumn {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl BaseColumn {
    pub const ALL: [BaseColumn; 5] = [
        BaseColumn::Open,
        BaseColumn::High,
        BaseColumn::Low,
        BaseColumn::Close,
        BaseColumn::Volume,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            BaseColumn::Open => "open",
            BaseColumn::High => "high",
            BaseColumn::Low => "low",
            BaseColumn::Close => "close",
            BaseColumn::Volume => "volume",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

#[derive(Debug, Clone)]
struct SessionCache {
    config: SessionConfig,
    entries: Vec<IndexEntry>,
}

/// Parallel columns of minute bars for a single symbol.
#[derive(Debug, Clone)]
pub struct BarStore {
    symbol: String,
    timezone: Tz,
    timestamps: Vec<NaiveDateTime>,
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    volume: Vec<f64>,
    derived: IndexMap<String, Vec<f64>>,
    vwap_acc: VwapAccumulator,
    sessions: Option<SessionCache>,
}

impl BarStore {
    /// Creates an empty store whose session clock is New York time.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self::with_timezone(symbol, chrono_tz::America::New_York)
    }

    pub fn with_timezone(symbol: impl Into<String>, timezone: Tz) -> Self {
        Self {
            symbol: symbol.into(),
            timezone,
            timestamps: Vec::new(),
            open: Vec::new(),
            high: Vec::new(),
            low: Vec::new(),
            close: Vec::new(),
            volume: Vec::new(),
            derived: IndexMap::new(),
            vwap_acc: VwapAccumulator::new(DEFAULT_VWAP_RESET_GAP_MINUTES),
            sessions: None,
        }
    }

    /// Sets the gap after which the running VWAP restarts. Applies to rows
    /// appended afterwards.
    pub fn with_vwap_reset_gap(mut self, minutes: i64) -> Self {
        self.vwap_acc = VwapAccumulator::new(minutes);
        self
    }

    pub fn vwap_reset_gap_minutes(&self) -> i64 {
        self.vwap_acc.reset_gap_minutes()
    }

    /// Builds a store from an ordered sequence of bars.
    pub fn from_bars(
        symbol: impl Into<String>,
        bars: impl IntoIterator<Item = RawBar>,
    ) -> Result<Self, EngineError> {
        let mut store = Self::new(symbol);
        for bar in bars {
            store.append(bar)?;
        }
        Ok(store)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn timestamp(&self, pos: usize) -> Option<NaiveDateTime> {
        self.timestamps.get(pos).copied()
    }

    pub fn open(&self) -> &[f64] {
        &self.open
    }

    pub fn high(&self) -> &[f64] {
        &self.high
    }

    pub fn low(&self) -> &[f64] {
        &self.low
    }

    pub fn close(&self) -> &[f64] {
        &self.close
    }

    pub fn volume(&self) -> &[f64] {
        &self.volume
    }

    pub fn base(&self, column: BaseColumn) -> &[f64] {
        match column {
            BaseColumn::Open => &self.open,
            BaseColumn::High => &self.high,
            BaseColumn::Low => &self.low,
            BaseColumn::Close => &self.close,
            BaseColumn::Volume => &self.volume,
        }
    }

    /// Looks up a base or derived column by name.
    pub fn column(&self, name: &str) -> Result<&[f64], EngineError> {
        if let Some(base) = BaseColumn::from_name(name) {
            return Ok(self.base(base));
        }
        self.derived
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| EngineError::ColumnNotFound {
                name: name.to_string(),
            })
    }

    pub fn has_column(&self, name: &str) -> bool {
        BaseColumn::from_name(name).is_some() || self.derived.contains_key(name)
    }

    /// Base columns first, then derived columns in the order they were added.
    pub fn column_names<'a>(&'a self) -> impl Iterator<Item = &'a str> + 'a {
        let base: [&'a str; 5] = BaseColumn::ALL.map(BaseColumn::name);
        base.into_iter()
            .chain(self.derived.keys().map(String::as_str))
    }

    /// Adds or replaces a derived column.
    pub fn set_column(&mut self, name: &str, values: Vec<f64>) -> Result<(), EngineError> {
        if BaseColumn::from_name(name).is_some() {
            return Err(EngineError::ReservedColumn {
                name: name.to_string(),
            });
        }
        if values.len() != self.len() {
            return Err(EngineError::ColumnLength {
                name: name.to_string(),
                expected: self.len(),
                actual: values.len(),
            });
        }
        debug!(symbol = %self.symbol, column = name, rows = values.len(), "derived column stored");
        self.derived.insert(name.to_string(), values);
        Ok(())
    }

    /// Appends one row and returns its position.
    ///
    /// Timestamps must be non-decreasing. While a `"vwap"` column exists it
    /// is extended with the bar's own VWAP when supplied, else with the
    /// running session VWAP. The first supplied VWAP creates the column and
    /// back-fills earlier rows with their running session VWAP. Every other
    /// derived column is padded with `NaN` until recomputed.
    pub fn append(&mut self, bar: RawBar) -> Result<usize, EngineError> {
        if let Some(&previous) = self.timestamps.last() {
            if bar.timestamp < previous {
                return Err(EngineError::NonMonotonicAppend {
                    previous,
                    timestamp: bar.timestamp,
                });
            }
        }

        let pos = self.len();
        if bar.vwap.is_some() && !self.derived.contains_key(VWAP) {
            let backfill = self.running_vwap(pos);
            self.derived.insert(VWAP.to_string(), backfill);
        }
        let running_vwap = self.vwap_acc.push(&bar);
        for (name, values) in self.derived.iter_mut() {
            let value = if name == VWAP {
                bar.vwap.unwrap_or(running_vwap)
            } else {
                f64::NAN
            };
            values.push(value);
        }

        self.timestamps.push(bar.timestamp);
        self.open.push(bar.open);
        self.high.push(bar.high);
        self.low.push(bar.low);
        self.close.push(bar.close);
        self.volume.push(bar.volume);

        if self.sessions.take().is_some() {
            debug!(symbol = %self.symbol, rows = self.len(), "session index invalidated by append");
        }
        Ok(pos)
    }

    /// Appends a bar stamped in UTC, converting it to the session clock first.
    pub fn append_utc(&mut self, ts_utc: DateTime<Utc>, bar: RawBar) -> Result<usize, EngineError> {
        let local = to_session_time(ts_utc, self.timezone);
        self.append(RawBar {
            timestamp: local,
            ..bar
        })
    }

    /// UTC instant of a stored row.
    pub fn utc_timestamp(&self, pos: usize, policy: DstPolicy) -> Result<DateTime<Utc>, EngineError> {
        let local = self.timestamp(pos).ok_or(EngineError::InvalidRange {
            start: pos as i64,
            end: pos as i64,
            len: self.len(),
        })?;
        from_session_time(local, self.timezone, policy)
    }

    /// First position whose timestamp equals `target`.
    pub fn find_exact(&self, target: NaiveDateTime) -> Result<usize, EngineError> {
        let pos = self.timestamps.partition_point(|t| *t < target);
        match self.timestamps.get(pos) {
            Some(t) if *t == target => Ok(pos),
            _ => Err(EngineError::NotFound { target }),
        }
    }

    /// Greatest position whose timestamp is `<= target`.
    pub fn find_floor(&self, target: NaiveDateTime) -> Result<usize, EngineError> {
        let after = self.timestamps.partition_point(|t| *t <= target);
        if after == 0 {
            return Err(match self.timestamps.first() {
                Some(&first) => EngineError::BeforeRangeStart { target, first },
                None => EngineError::NotFound { target },
            });
        }
        Ok(after - 1)
    }

    /// Inclusive rows whose timestamps fall within `[from, to]`.
    pub fn range_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<RangeInclusive<usize>, EngineError> {
        let start = self.timestamps.partition_point(|t| *t < from);
        let after = self.timestamps.partition_point(|t| *t <= to);
        if start >= after {
            return Err(EngineError::InvalidRange {
                start: start as i64,
                end: after as i64 - 1,
                len: self.len(),
            });
        }
        Ok(start..=after - 1)
    }

    /// Copies rows `start..=inclusive_end` (all columns) into a new store.
    ///
    /// Appending to the copy continues the running VWAP of the session that
    /// `inclusive_end` belongs to, exactly as appending to `self` would.
    pub fn slice(&self, start: usize, inclusive_end: usize) -> Result<BarStore, EngineError> {
        if start > inclusive_end || inclusive_end >= self.len() {
            return Err(EngineError::InvalidRange {
                start: start as i64,
                end: inclusive_end as i64,
                len: self.len(),
            });
        }
        let rows = start..inclusive_end + 1;
        // replay from the vwap session open
        let mut vwap_acc = VwapAccumulator::new(self.vwap_acc.reset_gap_minutes());
        for pos in self.vwap_session_start(start)..=inclusive_end {
            vwap_acc.push(&self.row(pos));
        }
        Ok(BarStore {
            symbol: self.symbol.clone(),
            timezone: self.timezone,
            timestamps: self.timestamps[rows.clone()].to_vec(),
            open: self.open[rows.clone()].to_vec(),
            high: self.high[rows.clone()].to_vec(),
            low: self.low[rows.clone()].to_vec(),
            close: self.close[rows.clone()].to_vec(),
            volume: self.volume[rows.clone()].to_vec(),
            derived: self
                .derived
                .iter()
                .map(|(name, values)| (name.clone(), values[rows.clone()].to_vec()))
                .collect(),
            vwap_acc,
            sessions: None,
        })
    }

    /// The base columns of one row as a [`RawBar`].
    ///
    /// # Panics
    /// If `pos` is out of bounds.
    pub fn row(&self, pos: usize) -> RawBar {
        RawBar {
            timestamp: self.timestamps[pos],
            open: self.open[pos],
            high: self.high[pos],
            low: self.low[pos],
            close: self.close[pos],
            volume: self.volume[pos],
            vwap: self.derived.get(VWAP).map(|v| v[pos]),
        }
    }

    /// Session index for `config`, rebuilt only when rows were appended or
    /// the config changed since the last call.
    pub fn sessions(&mut self, config: &SessionConfig) -> &[IndexEntry] {
        let stale = self
            .sessions
            .as_ref()
            .is_none_or(|cache| cache.config != *config);
        if stale {
            let entries = build_index(&self.timestamps, config);
            debug!(symbol = %self.symbol, sessions = entries.len(), "session index rebuilt");
            self.sessions = Some(SessionCache {
                config: *config,
                entries,
            });
        }
        self.sessions
            .as_ref()
            .map(|cache| cache.entries.as_slice())
            .unwrap_or_default()
    }

    /// First row of the VWAP session containing `pos`.
    fn vwap_session_start(&self, pos: usize) -> usize {
        let gap = TimeDelta::minutes(self.vwap_acc.reset_gap_minutes());
        (1..=pos)
            .rev()
            .find(|&i| self.timestamps[i] - self.timestamps[i - 1] > gap)
            .unwrap_or(0)
    }

    /// Running VWAP of rows `0..end` under the store's reset rule.
    fn running_vwap(&self, end: usize) -> Vec<f64> {
        let mut acc = VwapAccumulator::new(self.vwap_acc.reset_gap_minutes());
        (0..end).map(|pos| acc.push(&self.row(pos))).collect()
    }

    pub(crate) fn replace_vwap_accumulator(&mut self, acc: VwapAccumulator) {
        self.vwap_acc = acc;
    }
}
