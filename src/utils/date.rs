use crate::errors::{AppError, AppResult};
use chrono::NaiveDate;

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Parse `YYYY-MM-DD`, defaulting to today when absent.
pub fn parse_date_or_today(s: Option<&str>) -> AppResult<NaiveDate> {
    match s {
        Some(raw) => parse_date(raw.trim()).ok_or_else(|| AppError::InvalidDate(raw.to_string())),
        None => Ok(today()),
    }
}

pub fn date_str(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}
