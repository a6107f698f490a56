//! Stateless array -> array transforms over a row range.
//!
//! Every function takes `(start, end)` as signed row offsets and resolves them
//! with [`normalize_range`]:
//! - negative values count back from the row count (`len + value`);
//! - an `end` that is still non-positive is re-biased to `len + end`, so
//!   `(0, 0)` selects every row;
//! - `start` is moved one row left (`max(0, start - 1)`), giving callers one
//!   bar of left context whenever `start > 0`;
//! - both bounds are clamped into `[0, len]`.
//!
//! A range that collapses to nothing is not an error: extrema come back empty
//! and rolling series come back with no values.

use std::ops::Range;

/// Resolve signed `(start, end)` offsets into a half-open row range.
///
/// Returns `None` when the range is empty after clamping.
pub fn normalize_range(len: usize, start: isize, end: isize) -> Option<Range<usize>> {
    let n = len as isize;
    let mut start = if start < 0 { n + start } else { start };
    let mut end = if end < 0 { n + end } else { end };
    if end <= 0 {
        end += n;
    }
    start = (start - 1).max(0);
    let start = start.clamp(0, n) as usize;
    let end = end.clamp(0, n) as usize;
    if start >= end { None } else { Some(start..end) }
}

/// Pairwise ordering test used by [`count_prior`] and threshold monitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Greater,
    GreaterEq,
    Less,
    LessEq,
}

impl Comparison {
    pub fn holds(self, left: f64, right: f64) -> bool {
        match self {
            Comparison::Greater => left > right,
            Comparison::GreaterEq => left >= right,
            Comparison::Less => left < right,
            Comparison::LessEq => left <= right,
        }
    }
}

/// Rows whose value is the maximum of the centered window `[i - n, i + n]`.
///
/// The window is evaluated against the whole array, not just the selected
/// range, and ties qualify: a flat top produces one index per tied row.
/// Non-finite values never qualify.
pub fn local_maxima(values: &[f64], start: isize, end: isize, window: usize) -> Vec<usize> {
    local_extrema(values, start, end, window, |candidate, other| other > candidate)
}

/// Rows whose value is the minimum of the centered window `[i - n, i + n]`.
pub fn local_minima(values: &[f64], start: isize, end: isize, window: usize) -> Vec<usize> {
    local_extrema(values, start, end, window, |candidate, other| other < candidate)
}

fn local_extrema<F>(values: &[f64], start: isize, end: isize, window: usize, beats: F) -> Vec<usize>
where
    F: Fn(f64, f64) -> bool,
{
    let Some(range) = normalize_range(values.len(), start, end) else {
        return Vec::new();
    };
    let last = values.len() - 1;

    range
        .filter(|&i| {
            let candidate = values[i];
            if !candidate.is_finite() {
                return false;
            }
            let lo = i.saturating_sub(window);
            let hi = (i + window).min(last);
            !values[lo..=hi].iter().any(|&other| beats(candidate, other))
        })
        .collect()
}

/// Trailing mean over `window` rows, one output per row in the range.
///
/// The window never reaches back across the range start: outputs before
/// `window` values are available are `0.0`.
pub fn rolling_mean(values: &[f64], start: isize, end: isize, window: usize) -> Vec<f64> {
    let Some(range) = normalize_range(values.len(), start, end) else {
        return Vec::new();
    };
    let slice = &values[range];
    let mut out = vec![0.0; slice.len()];
    if window == 0 {
        return out;
    }

    let divisor = window as f64;
    let mut sum = 0.0;
    for (j, &value) in slice.iter().enumerate() {
        sum += value;
        if j >= window {
            sum -= slice[j - window];
        }
        if j + 1 >= window {
            out[j] = sum / divisor;
        }
    }
    out
}

/// Rolling z-score scaled by 100 and rounded: `round((x - mean) / sd * 100)`.
///
/// `sd` is the sample standard deviation (divides by `window - 1`). A
/// window whose values are all equal has `sd == 0` and produces `0.0`, as do
/// rows before the first full window and any `window < 2`.
pub fn rolling_standardize(values: &[f64], start: isize, end: isize, window: usize) -> Vec<f64> {
    let Some(range) = normalize_range(values.len(), start, end) else {
        return Vec::new();
    };
    let means = rolling_mean(values, start, end, window);
    let slice = &values[range];
    let mut out = vec![0.0; slice.len()];
    if window < 2 {
        return out;
    }

    let dof = (window - 1) as f64;
    for j in (window - 1)..slice.len() {
        let mean = means[j];
        let trailing = &slice[j + 1 - window..=j];
        // constant window: sd is exactly zero
        if trailing.iter().all(|x| *x == trailing[0]) {
            continue;
        }
        let variance = trailing.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / dof;
        let stddev = variance.sqrt();
        if !stddev.is_finite() || stddev == 0.0 {
            continue;
        }
        out[j] = (((slice[j] - mean) / stddev) * 100.0).round();
    }
    out
}

/// Length of the dominated run immediately preceding each row.
///
/// For row `i`, counts how many directly preceding rows could be walked back
/// over while `cmp(values[i], values[k])` holds, jumping over rows that an
/// earlier row already dominated. Runs in amortized linear time with a
/// monotonic stack of `(position, cached count)` pairs.
pub fn count_prior<F>(values: &[f64], start: isize, end: isize, cmp: F) -> Vec<u32>
where
    F: Fn(f64, f64) -> bool,
{
    let Some(range) = normalize_range(values.len(), start, end) else {
        return Vec::new();
    };
    let slice = &values[range];
    let mut out = vec![0u32; slice.len()];
    let mut stack: Vec<(usize, u32)> = Vec::with_capacity(slice.len());

    for (i, &value) in slice.iter().enumerate() {
        let mut total = 0u32;
        while let Some(&(top, cached)) = stack.last() {
            if !cmp(value, slice[top]) {
                break;
            }
            total += cached + 1;
            stack.pop();
        }
        out[i] = total;
        stack.push((i, total));
    }
    out
}

/// [`count_prior`] driven by a [`Comparison`].
pub fn count_prior_by(values: &[f64], start: isize, end: isize, cmp: Comparison) -> Vec<u32> {
    count_prior(values, start, end, |a, b| cmp.holds(a, b))
}
