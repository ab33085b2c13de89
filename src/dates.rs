//! Calendar-day helpers.
//!
//! All per-day bookkeeping is keyed by the local calendar day as a
//! `YYYY-MM-DD` string. Arithmetic runs on `NaiveDate`, so a day is a day
//! regardless of DST transitions; wall-clock time only enters when a slot's
//! due instant is materialised.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone};
use regex::Regex;

use crate::config::SlotTime;

pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

static DATE_KEY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// Strict `YYYY-MM-DD` shape check (digits and dashes only, no padding
/// variations accepted).
pub fn is_valid_key(key: &str) -> bool {
    DATE_KEY_RE.is_match(key)
}

/// Day key of a calendar date.
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

pub fn parse_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, DATE_KEY_FORMAT).ok()
}

/// Day key shifted by `delta` days. Unparseable keys pass through unchanged.
pub fn add_days(key: &str, delta: i64) -> String {
    match parse_key(key) {
        Some(date) => date_key(date + Duration::days(delta)),
        None => key.to_string(),
    }
}

/// Whole-day difference `to - from`; zero if either key is unparseable.
pub fn day_diff(from: &str, to: &str) -> i64 {
    match (parse_key(from), parse_key(to)) {
        (Some(a), Some(b)) => (b - a).num_days(),
        _ => 0,
    }
}

/// Epoch milliseconds at which a slot is due on the given day, local time.
///
/// `None` for unparseable keys or local instants that do not exist
/// (spring-forward gap).
pub fn slot_due_ms(key: &str, time: SlotTime) -> Option<i64> {
    let naive = parse_key(key)?.and_hms_opt(time.hour, time.minute, 0)?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|due| due.timestamp_millis())
}

/// Day key of an epoch-milliseconds timestamp, local time.
pub fn key_from_epoch_ms(ts: i64) -> Option<String> {
    Local
        .timestamp_millis_opt(ts)
        .single()
        .map(|at: DateTime<Local>| date_key(at.date_naive()))
}
