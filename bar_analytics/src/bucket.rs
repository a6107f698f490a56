//! Bucket mapping over session wall-clock time.
//!
//! - One stable epoch: 1970-01-01T00:00:00 on the session clock.
//! - Fixed-size frames (minute/hour/day): second-based math.
//! - Week: Monday 00:00-aligned using a week epoch of 1969-12-29.
//!
//! Buckets are computed on the naive session clock, so a `1D` bucket is a
//! calendar day in the exchange timezone, not a UTC day.

use std::{fmt, num::NonZeroU32, str::FromStr};

use anyhow::{anyhow, bail};
use chrono::{NaiveDateTime, TimeDelta};

pub const SECS_PER_MINUTE: i64 = 60;
pub const SECS_PER_HOUR: i64 = 60 * SECS_PER_MINUTE;
pub const SECS_PER_DAY: i64 = 24 * SECS_PER_HOUR;
pub const SECS_PER_WEEK: i64 = 7 * SECS_PER_DAY;

/// shift so Monday 1969-12-29 00:00 becomes index 0
const WEEK_MONDAY_ANCHOR_OFFSET_SECS: i64 = 3 * SECS_PER_DAY;

/// Timeframe granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeframeUnit {
    Minute,
    Hour,
    Day,
    /// Monday-based
    Week,
}

/// A timeframe = amount x unit (e.g. 5-Minute, 4-Hour, 1-Week).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeframe {
    pub amount: NonZeroU32,
    pub unit: TimeframeUnit,
}

impl Timeframe {
    pub const fn new(amount: NonZeroU32, unit: TimeframeUnit) -> Self {
        Self { amount, unit }
    }

    /// Bucket width in seconds.
    pub const fn width_secs(&self) -> i64 {
        let unit = match self.unit {
            TimeframeUnit::Minute => SECS_PER_MINUTE,
            TimeframeUnit::Hour => SECS_PER_HOUR,
            TimeframeUnit::Day => SECS_PER_DAY,
            TimeframeUnit::Week => SECS_PER_WEEK,
        };
        unit * self.amount.get() as i64
    }
}

/// `"5m"`, `"4h"`, `"1D"`, `"1W"`
impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let u = match self.unit {
            TimeframeUnit::Minute => "m",
            TimeframeUnit::Hour => "h",
            TimeframeUnit::Day => "D",
            TimeframeUnit::Week => "W",
        };
        write!(f, "{}{u}", self.amount.get())
    }
}

impl FromStr for Timeframe {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            bail!("empty timeframe");
        }
        let split = s.char_indices().last().map_or(0, |(i, _)| i);
        let (digits, unit) = s.split_at(split);
        let amount: u32 = digits
            .parse()
            .map_err(|_| anyhow!("bad timeframe amount: {s}"))?;
        let amount = NonZeroU32::new(amount).ok_or_else(|| anyhow!("amount must be > 0"))?;
        let unit = match unit {
            "m" => TimeframeUnit::Minute,
            "h" | "H" => TimeframeUnit::Hour,
            "D" | "d" => TimeframeUnit::Day,
            "W" | "w" => TimeframeUnit::Week,
            _ => bail!("unknown timeframe unit: {unit}"),
        };
        Ok(Timeframe::new(amount, unit))
    }
}

fn epoch_secs(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp()
}

/// Bucket id for a session wall-clock timestamp.
pub fn bucket_id(ts: NaiveDateTime, tf: Timeframe) -> i64 {
    let secs = epoch_secs(ts);
    match tf.unit {
        TimeframeUnit::Week => (secs + WEEK_MONDAY_ANCHOR_OFFSET_SECS).div_euclid(tf.width_secs()),
        _ => secs.div_euclid(tf.width_secs()),
    }
}

/// First wall-clock instant of a bucket.
pub fn bucket_start(id: i64, tf: Timeframe) -> NaiveDateTime {
    let offset = id * tf.width_secs();
    let secs = match tf.unit {
        TimeframeUnit::Week => offset - WEEK_MONDAY_ANCHOR_OFFSET_SECS,
        _ => offset,
    };
    NaiveDateTime::default() + TimeDelta::seconds(secs)
}

/// Exclusive end of a bucket (start + width).
pub fn bucket_end_exclusive(id: i64, tf: Timeframe) -> NaiveDateTime {
    bucket_start(id, tf) + TimeDelta::seconds(tf.width_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate, Weekday};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn five_minute_buckets() {
        let tf: Timeframe = "5m".parse().unwrap();
        let id = bucket_id(at(2024, 6, 3, 9, 33), tf);
        assert_eq!(bucket_start(id, tf), at(2024, 6, 3, 9, 30));
        assert_eq!(bucket_end_exclusive(id, tf), at(2024, 6, 3, 9, 35));
        assert_eq!(bucket_id(at(2024, 6, 3, 9, 34), tf), id);
        assert_eq!(bucket_id(at(2024, 6, 3, 9, 35), tf), id + 1);
    }

    #[test]
    fn weeks_start_on_monday() {
        let tf: Timeframe = "1W".parse().unwrap();
        // Sunday evening Globex open belongs to the week that started the Monday before
        let start = bucket_start(bucket_id(at(2024, 6, 2, 18, 0), tf), tf);
        assert_eq!(start, at(2024, 5, 27, 0, 0));
        assert_eq!(start.weekday(), Weekday::Mon);
    }

    #[test]
    fn parse_and_display() {
        let tf: Timeframe = "4h".parse().unwrap();
        assert_eq!(tf.to_string(), "4h");
        assert_eq!(tf.width_secs(), 4 * SECS_PER_HOUR);
        assert!("0m".parse::<Timeframe>().is_err());
        assert!("5x".parse::<Timeframe>().is_err());
        assert!("".parse::<Timeframe>().is_err());
    }
}
