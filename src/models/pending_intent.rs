use super::intent_kind::IntentKind;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A check-in/check-out attempt that could not reach the server.
/// Owned by the offline queue; replayed then deleted, never edited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingIntent {
    pub local_id: i64,
    pub kind: IntentKind,
    pub subject_id: String,
    pub event_id: String,
    pub activity_id: Option<String>,
    pub scanned_by: String,
    pub enqueued_at: NaiveDateTime,
}

/// Fields supplied by the caller; `local_id` and `enqueued_at` are assigned
/// by the store.
#[derive(Debug, Clone)]
pub struct NewIntent {
    pub subject_id: String,
    pub event_id: String,
    pub activity_id: Option<String>,
    pub scanned_by: String,
}

impl NewIntent {
    pub fn new(
        subject_id: impl Into<String>,
        event_id: impl Into<String>,
        activity_id: Option<String>,
        scanned_by: impl Into<String>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            event_id: event_id.into(),
            activity_id,
            scanned_by: scanned_by.into(),
        }
    }

    pub fn stamped(&self, local_id: i64, kind: IntentKind) -> PendingIntent {
        PendingIntent {
            local_id,
            kind,
            subject_id: self.subject_id.clone(),
            event_id: self.event_id.clone(),
            activity_id: self.activity_id.clone(),
            scanned_by: self.scanned_by.clone(),
            enqueued_at: Local::now().naive_local(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingCounts {
    pub check_ins: u64,
    pub check_outs: u64,
    pub total: u64,
}

impl PendingCounts {
    pub fn new(check_ins: u64, check_outs: u64) -> Self {
        Self {
            check_ins,
            check_outs,
            total: check_ins + check_outs,
        }
    }
}
