//! Session clock conversions.
//!
//! The store keeps wall-clock timestamps in the exchange session timezone
//! (e.g. "America/New_York" for CME index futures, where Globex opens at
//! 18:00 local). Feeds and repositories speak UTC, so this module converts at
//! the edges:
//! - [`to_session_time`]: UTC instant -> session wall clock (always unique).
//! - [`from_session_time`]: session wall clock -> UTC, with a [`DstPolicy`] for
//!   the two DST edge cases.
//! - [`parse_timezone`]: IANA name -> [`Tz`].
//!
//! Ambiguous local times happen during "fall back" when a wall time occurs
//! twice; nonexistent ones during "spring forward" when a wall time is skipped.
//! Overnight sessions straddle both transitions, so callers mapping stored
//! rows back to UTC must pick a policy.

use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

use crate::errors::EngineError;

/// Policy for handling DST edge cases when mapping wall clock to UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DstPolicy {
    /// Error on ambiguous or nonexistent local times.
    #[default]
    Strict,
    /// Ambiguous: pick the earlier instant (daylight occurrence).
    PreferEarliest,
    /// Ambiguous: pick the later instant (standard-time occurrence).
    PreferLatest,
    /// Nonexistent: step forward a minute at a time (max 2 hours) to the
    /// first valid instant. Ambiguous times resolve to the earliest.
    ShiftForward,
}

/// Parse an IANA time zone name such as `"America/Chicago"`.
pub fn parse_timezone(name: &str) -> anyhow::Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("bad tz: {name}"))
}

/// UTC instant -> session wall-clock time.
pub fn to_session_time(ts_utc: DateTime<Utc>, tz: Tz) -> NaiveDateTime {
    ts_utc.with_timezone(&tz).naive_local()
}

/// Session wall-clock time -> UTC instant under `policy`.
pub fn from_session_time(
    local: NaiveDateTime,
    tz: Tz,
    policy: DstPolicy,
) -> Result<DateTime<Utc>, EngineError> {
    use chrono::offset::LocalResult::*;
    match tz.from_local_datetime(&local) {
        Single(dt) => Ok(dt.with_timezone(&Utc)),
        Ambiguous(early, late) => match policy {
            DstPolicy::PreferEarliest | DstPolicy::ShiftForward => Ok(early.with_timezone(&Utc)),
            DstPolicy::PreferLatest => Ok(late.with_timezone(&Utc)),
            DstPolicy::Strict => Err(EngineError::AmbiguousLocalTime { local }),
        },
        None => match policy {
            DstPolicy::ShiftForward => {
                let mut t = local;
                for _ in 0..120 {
                    t += TimeDelta::minutes(1);
                    if let Single(dt) = tz.from_local_datetime(&t) {
                        return Ok(dt.with_timezone(&Utc));
                    }
                }
                Err(EngineError::NonexistentLocalTime { local })
            }
            _ => Err(EngineError::NonexistentLocalTime { local }),
        },
    }
}
