// src/table/timekey.rs

//! Time keys shared by the two datasets.

use chrono::{NaiveDate, NaiveDateTime};

/// Date-only layouts. Two-digit years are tried before four-digit ones so
/// that `1/22/20` is 2020, not year 20.
const DATE_FORMATS: &[&str] = &["%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d", "%Y%m%d"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y%m%d %H:%M",
];

/// Parse a date or date-time cell. Date-only values are midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// `YYYY-MM-DD`, the join key of both datasets.
pub fn date_key(at: &NaiveDateTime) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// The timestamp floored to its hour.
pub fn hour_key(at: &NaiveDateTime) -> String {
    at.format("%Y-%m-%d %H:00:00").to_string()
}
