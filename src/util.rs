// Utility helpers for parsing dates, deriving period keys and console
// formatting.
//
// Everything that turns raw TSV strings into typed values lives here so the
// loader and the tabulation engine can assume clean inputs.
use crate::types::{PeriodKeys, UNKNOWN};
use chrono::{Datelike, Duration, NaiveDate};
use num_format::{Locale, ToFormattedString};

pub const MONTH_FORMAT: &str = "%Y/%m";
pub const DAY_FORMAT: &str = "%Y/%m/%d";

/// Parse a collection date.
///
/// - Trims whitespace.
/// - Accepts `YYYY-MM-DD` and `YYYY/MM/DD`.
/// - Accepts the partial forms `YYYY-MM`, `YYYY/MM` and `YYYY`, which
///   resolve to the first day of that month or year.
/// - Returns `None` for anything else; the caller decides whether that is
///   fatal.
pub fn parse_collection_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    let parts: Vec<&str> = s.split(|c| c == '-' || c == '/').collect();
    match parts.as_slice() {
        [y, m] if y.len() == 4 && !m.is_empty() && m.len() <= 2 => {
            NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, 1)
        }
        [y] if y.len() == 4 => NaiveDate::from_ymd_opt(y.parse().ok()?, 1, 1),
        _ => None,
    }
}

/// The Sunday that ends the week containing `date`.
///
/// Weekdays count 0 for Monday through 6 for Sunday, and the key is
/// `date - (weekday - 6)` days, so a Sunday maps to itself and every other
/// day moves forward.
pub fn week_ending(date: NaiveDate) -> NaiveDate {
    let weekday = date.weekday().num_days_from_monday() as i64;
    date - Duration::days(weekday - 6)
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    // Day 1 always exists, so `with_day` cannot fail here.
    date.with_day(1).unwrap_or(date)
}

pub fn period_keys(date: NaiveDate) -> PeriodKeys {
    PeriodKeys {
        date,
        month: date.format(MONTH_FORMAT).to_string(),
        day: date.format(DAY_FORMAT).to_string(),
        week: week_ending(date).format(DAY_FORMAT).to_string(),
    }
}

/// Replace a missing or blank cell with the `unknown` category.
pub fn or_unknown(s: Option<String>) -> String {
    match s {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => UNKNOWN.to_string(),
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Counts in console messages, e.g. `9,855 samples loaded`.
    n.to_formatted_string(&Locale::en)
}
