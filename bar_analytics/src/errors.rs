use chrono::NaiveDateTime;
use thiserror::Error;

/// The unified error type for the `bar_analytics` crate.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// A base or derived column was requested by name but does not exist.
    #[error("Column not found: {name}")]
    ColumnNotFound { name: String },

    /// A row range was empty or reversed after normalization, or ran past the end.
    #[error("Invalid range: start={start}, end={end} (rows={len})")]
    InvalidRange { start: i64, end: i64, len: usize },

    /// A floor lookup targeted a time earlier than the first stored row.
    #[error("{target} precedes the first stored timestamp {first}")]
    BeforeRangeStart {
        target: NaiveDateTime,
        first: NaiveDateTime,
    },

    /// An exact lookup found no row with the requested timestamp.
    #[error("No row at {target}")]
    NotFound { target: NaiveDateTime },

    /// A row was appended with a timestamp earlier than the last stored one.
    #[error("Out-of-order append: {timestamp} is earlier than {previous}")]
    NonMonotonicAppend {
        previous: NaiveDateTime,
        timestamp: NaiveDateTime,
    },

    /// A derived column did not match the store's row count.
    #[error("Column '{name}' has {actual} values, expected {expected}")]
    ColumnLength {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Base OHLCV columns cannot be overwritten through the derived-column API.
    #[error("Column '{name}' is a base column and cannot be replaced")]
    ReservedColumn { name: String },

    /// A session wall-clock time maps to two instants (fall-back).
    #[error("Ambiguous local time: {local}")]
    AmbiguousLocalTime { local: NaiveDateTime },

    /// A session wall-clock time falls in a DST gap (spring-forward).
    #[error("Nonexistent local time: {local}")]
    NonexistentLocalTime { local: NaiveDateTime },
}
