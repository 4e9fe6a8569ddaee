//! Time utilities: parsing HH:MM and timestamps, storage formatting.

use crate::errors::{AppError, AppResult};
use chrono::{Local, NaiveDateTime, NaiveTime};

/// Storage format for entry timestamps (`time_entries.*_time`).
pub const DB_DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

pub fn parse_time(t: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(t, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M:%S"))
        .ok()
}

pub fn parse_time_arg(t: &str) -> AppResult<NaiveTime> {
    parse_time(t.trim()).ok_or_else(|| AppError::InvalidTime(t.to_string()))
}

/// Accepts `YYYY-MM-DD HH:MM[:SS]` or the `T`-separated ISO form.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
}

pub fn parse_datetime_arg(s: &str) -> AppResult<NaiveDateTime> {
    parse_datetime(s).ok_or_else(|| AppError::InvalidTime(s.to_string()))
}

pub fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DB_DATETIME_FMT).to_string()
}

/// Server clock, local wall time (entries are stored without offset).
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}
