#![allow(dead_code)]

use bar_analytics::{BarStore, RawBar, derived::compute_vwap};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

/// Rows in one 18:00 -> 16:59 overnight session.
pub const SESSION_ROWS: usize = 23 * 60;

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .expect("valid date")
        .and_hms_opt(h, min, 0)
        .expect("valid time")
}

/// Sunday 2024-06-02 18:00, the first Globex open used by the fixtures.
pub fn first_open() -> NaiveDateTime {
    at(2024, 6, 2, 18, 0)
}

/// Triangle-wave price, shifted up 10 points per session.
pub fn price(session: usize, row: usize) -> f64 {
    5000.0 + session as f64 * 10.0 + ((row % 120) as f64 - 60.0).abs() * 0.25
}

/// `rows` consecutive minute bars starting at `from`.
pub fn minute_bars(from: NaiveDateTime, session: usize, rows: usize) -> Vec<RawBar> {
    (0..rows)
        .map(|i| {
            let p = price(session, i);
            RawBar::new(
                from + TimeDelta::minutes(i as i64),
                p,
                p + 0.5,
                p - 0.5,
                p + 0.25,
                10.0 + (i % 7) as f64,
            )
        })
        .collect()
}

/// `sessions` back-to-back overnight sessions with a computed vwap column.
pub fn overnight_store(sessions: usize) -> BarStore {
    let mut store = BarStore::new("ES");
    for s in 0..sessions {
        let open = first_open() + TimeDelta::days(s as i64);
        for bar in minute_bars(open, s, SESSION_ROWS) {
            store.append(bar).expect("ordered fixture");
        }
    }
    compute_vwap(&mut store, 30).expect("vwap");
    store
}

/// One overnight session where every price is `p`.
pub fn flat_session(p: f64) -> BarStore {
    let bars = (0..SESSION_ROWS)
        .map(|i| RawBar::new(first_open() + TimeDelta::minutes(i as i64), p, p, p, p, 5.0));
    let mut store = BarStore::from_bars("NQ", bars).expect("ordered fixture");
    compute_vwap(&mut store, 30).expect("vwap");
    store
}
