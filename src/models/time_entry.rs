use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Automatically derived anomaly marker attached to an entry for review.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntryFlag {
    EarlyArrival,
    LateStay,
}

impl EntryFlag {
    /// Convert enum → DB string
    pub fn to_db_str(&self) -> &'static str {
        match self {
            EntryFlag::EarlyArrival => "early_arrival",
            EntryFlag::LateStay => "late_stay",
        }
    }

    /// Convert DB string → enum
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "early_arrival" => Some(EntryFlag::EarlyArrival),
            "late_stay" => Some(EntryFlag::LateStay),
            _ => None,
        }
    }
}

pub type FlagSet = BTreeSet<EntryFlag>;

/// Serialize a flag set into the comma separated form stored in `time_entries.flags`.
pub fn flags_to_db(flags: &FlagSet) -> String {
    flags
        .iter()
        .map(|f| f.to_db_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse the stored column back; unknown tokens are ignored.
pub fn flags_from_db(s: &str) -> FlagSet {
    s.split(',')
        .filter_map(|t| EntryFlag::from_db_str(t.trim()))
        .collect()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Normal,
    Flagged,
}

impl ReviewStatus {
    pub fn for_flags(flags: &FlagSet) -> Self {
        if flags.is_empty() {
            ReviewStatus::Normal
        } else {
            ReviewStatus::Flagged
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ReviewStatus::Normal => "normal",
            ReviewStatus::Flagged => "flagged",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(ReviewStatus::Normal),
            "flagged" => Some(ReviewStatus::Flagged),
            _ => None,
        }
    }
}

pub const DEFAULT_CHECK_IN_METHOD: &str = "av_scan";

/// Server-authoritative check-in/check-out record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: i64,
    pub student_id: String,
    pub event_id: String,
    pub activity_id: String,
    pub check_in_time: NaiveDateTime,
    pub check_out_time: Option<NaiveDateTime>,
    pub hours_worked: Option<f64>,
    pub flags: FlagSet,
    pub review_status: ReviewStatus,
    pub check_in_method: String,
    pub scanned_by: String,
    pub check_out_scanned_by: Option<String>,
    pub forced_checkout_reason: Option<String>,
    pub modification_reason: Option<String>,
}

impl TimeEntry {
    pub fn is_open(&self) -> bool {
        self.check_out_time.is_none()
    }

    pub fn check_in_date(&self) -> NaiveDate {
        self.check_in_time.date()
    }
}
