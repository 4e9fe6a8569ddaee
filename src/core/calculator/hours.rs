//! Duration rounding shared by check-out, force-checkout and manual edits.

use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HoursBreakdown {
    /// Whole minutes between check-in and check-out (never negative).
    pub minutes: i64,
    /// minutes / 60
    pub raw: f64,
    /// Raw hours rounded half-up to the nearest 0.5
    pub rounded: f64,
}

/// Round to the nearest half hour, half-up: 6h13m → 6.0, 6h15m → 6.5, 6h47m → 7.0.
pub fn round_to_half_hour(raw: f64) -> f64 {
    (raw * 2.0).round() / 2.0
}

pub fn calculate_hours(check_in: NaiveDateTime, check_out: NaiveDateTime) -> HoursBreakdown {
    let minutes = (check_out - check_in).num_minutes().max(0);
    let raw = minutes as f64 / 60.0;

    HoursBreakdown {
        minutes,
        raw,
        rounded: round_to_half_hour(raw),
    }
}
