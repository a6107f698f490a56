//! Derived columns computed from the base OHLCV data.
//!
//! Each `compute_*` function writes one named column into the store,
//! replacing any previous version of it.

use chrono::{NaiveDateTime, TimeDelta};
use tracing::info;

use crate::{
    errors::EngineError,
    models::RawBar,
    store::{BarStore, STRAT, VWAP},
    window::rolling_standardize,
};

/// Running session VWAP over typical price `(h + l + c) / 3`.
///
/// Resets whenever the gap to the previous bar exceeds the reset gap.
#[derive(Debug, Clone)]
pub(crate) struct VwapAccumulator {
    reset_gap: TimeDelta,
    price_volume: f64,
    volume: f64,
    last: Option<NaiveDateTime>,
}

impl VwapAccumulator {
    pub(crate) fn new(reset_gap_minutes: i64) -> Self {
        Self {
            reset_gap: TimeDelta::minutes(reset_gap_minutes),
            price_volume: 0.0,
            volume: 0.0,
            last: None,
        }
    }

    pub(crate) fn reset_gap_minutes(&self) -> i64 {
        self.reset_gap.num_minutes()
    }

    pub(crate) fn push(&mut self, bar: &RawBar) -> f64 {
        if let Some(last) = self.last {
            if bar.timestamp - last > self.reset_gap {
                self.price_volume = 0.0;
                self.volume = 0.0;
            }
        }
        self.last = Some(bar.timestamp);

        let typical = (bar.high + bar.low + bar.close) / 3.0;
        self.price_volume += typical * bar.volume;
        self.volume += bar.volume;
        if self.volume > 0.0 {
            self.price_volume / self.volume
        } else {
            typical
        }
    }
}

/// Writes the cumulative session VWAP into the `"vwap"` column.
///
/// Later appends keep extending the column with the same reset rule.
pub fn compute_vwap(store: &mut BarStore, reset_gap_minutes: i64) -> Result<(), EngineError> {
    let mut acc = VwapAccumulator::new(reset_gap_minutes);
    let values: Vec<f64> = (0..store.len()).map(|pos| acc.push(&store.row(pos))).collect();
    store.set_column(VWAP, values)?;
    store.replace_vwap_accumulator(acc);
    info!(symbol = store.symbol(), rows = store.len(), reset_gap_minutes, "vwap computed");
    Ok(())
}

/// Bar-type classification against the previous bar.
///
/// `1` inside, `3` outside, `2` took out only the prior high, `-2` took out
/// only the prior low. The first row has no prior bar and is `0`.
pub fn strat_series(high: &[f64], low: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; high.len()];
    for i in 1..high.len() {
        let higher = high[i] > high[i - 1];
        let lower = low[i] < low[i - 1];
        out[i] = match (higher, lower) {
            (false, false) => 1.0,
            (true, true) => 3.0,
            (true, false) => 2.0,
            (false, true) => -2.0,
        };
    }
    out
}

/// Writes [`strat_series`] into the `"strat"` column.
pub fn compute_strat(store: &mut BarStore) -> Result<(), EngineError> {
    let values = strat_series(store.high(), store.low());
    store.set_column(STRAT, values)
}

/// Writes a full-length rolling z-score (x100, rounded) of `source` into `name`.
pub fn compute_standardized(
    store: &mut BarStore,
    source: &str,
    window: usize,
    name: &str,
) -> Result<(), EngineError> {
    let values = rolling_standardize(store.column(source)?, 0, 0, window);
    let values = if values.is_empty() {
        vec![0.0; store.len()]
    } else {
        values
    };
    store.set_column(name, values)
}
