//! Anomaly flags derived from scheduled start/end times.

use crate::models::time_entry::{EntryFlag, FlagSet};
use chrono::{Duration, NaiveDateTime};

pub const DEFAULT_GRACE_MINUTES: i64 = 15;

/// Grace windows around the typical start/end of an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagPolicy {
    pub early_grace_minutes: i64,
    pub late_grace_minutes: i64,
}

impl Default for FlagPolicy {
    fn default() -> Self {
        Self {
            early_grace_minutes: DEFAULT_GRACE_MINUTES,
            late_grace_minutes: DEFAULT_GRACE_MINUTES,
        }
    }
}

impl FlagPolicy {
    pub fn new(early_grace_minutes: i64, late_grace_minutes: i64) -> Self {
        Self {
            early_grace_minutes,
            late_grace_minutes,
        }
    }

    /// Strict: arriving exactly at the grace boundary is not flagged.
    pub fn is_early_arrival(&self, check_in: NaiveDateTime, typical_start: NaiveDateTime) -> bool {
        check_in < typical_start - Duration::minutes(self.early_grace_minutes)
    }

    pub fn is_late_stay(&self, check_out: NaiveDateTime, typical_end: NaiveDateTime) -> bool {
        check_out > typical_end + Duration::minutes(self.late_grace_minutes)
    }

    pub fn flags(
        &self,
        check_in: NaiveDateTime,
        check_out: Option<NaiveDateTime>,
        typical_start: NaiveDateTime,
        typical_end: NaiveDateTime,
    ) -> FlagSet {
        let mut flags = FlagSet::new();

        if self.is_early_arrival(check_in, typical_start) {
            flags.insert(EntryFlag::EarlyArrival);
        }

        if let Some(out) = check_out
            && self.is_late_stay(out, typical_end)
        {
            flags.insert(EntryFlag::LateStay);
        }

        flags
    }
}

pub fn is_early_arrival(check_in: NaiveDateTime, typical_start: NaiveDateTime) -> bool {
    FlagPolicy::default().is_early_arrival(check_in, typical_start)
}

pub fn is_late_stay(check_out: NaiveDateTime, typical_end: NaiveDateTime) -> bool {
    FlagPolicy::default().is_late_stay(check_out, typical_end)
}

pub fn get_flags(
    check_in: NaiveDateTime,
    check_out: Option<NaiveDateTime>,
    typical_start: NaiveDateTime,
    typical_end: NaiveDateTime,
) -> FlagSet {
    FlagPolicy::default().flags(check_in, check_out, typical_start, typical_end)
}
