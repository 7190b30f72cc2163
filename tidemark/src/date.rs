//! Date helpers shared by migration naming and the type normalizer

use crate::error::{Error, Result};
use chrono::{NaiveDateTime, Timelike};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Zero-pad a number to two digits
pub fn two_digits(num: usize) -> String {
    format!("{:02}", num)
}

/// Format a date as `YYYYMMDD_HHMMSS`, the prefix of every migration name
pub fn snake(date: &NaiveDateTime) -> String {
    date.format("%Y%m%d_%H%M%S").to_string()
}

/// Format a date as `YYYY-MM-DD HH:MM:SS.mmm`
pub fn format_datetime(date: &NaiveDateTime) -> String {
    let millis = date.nanosecond() / 1_000_000 % 1000;
    format!("{}.{:03}", date.format("%Y-%m-%d %H:%M:%S"), millis)
}

/// Parse a datetime read back from a backend
pub fn parse_datetime(value: &str) -> Result<NaiveDateTime> {
    let trimmed = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| Error::decode(format!("Invalid datetime: {}", value)))
}
