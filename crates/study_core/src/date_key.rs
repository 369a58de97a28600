//! Canonical `YYYY-MM-DD` keys for calendar days.
//!
//! Every map in the planner is keyed by these strings, so this module is the
//! only place that decides what day a key names. Dates are local calendar
//! dates; no timezone conversion happens anywhere.

use chrono::{Datelike, NaiveDate};

pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

const DAY_NAMES: [&str; 7] = ["Dom", "Lun", "Mar", "Mié", "Jue", "Vie", "Sáb"];

pub fn format_date_key(date: NaiveDate) -> String {
    format!("{}-{:02}-{:02}", date.year(), date.month(), date.day())
}

/// Parses a key produced by [`format_date_key`].
///
/// Well-formed keys are a precondition. A malformed key yields `None`, and
/// callers treat it as a day that does not exist.
pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key.trim(), DATE_KEY_FORMAT).ok()
}

/// Short day name for a weekday index, Sunday = 0. Indices wrap modulo 7.
pub fn day_name(weekday: u32) -> &'static str {
    DAY_NAMES[(weekday % 7) as usize]
}

pub fn day_initial(weekday: u32) -> char {
    day_name(weekday).chars().next().unwrap_or(' ')
}

pub fn weekday_index(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_sunday()
}
