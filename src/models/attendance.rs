//! Request/response bodies of the attendance and reconciliation operations.
//! Business outcomes (duplicate scan, not checked in) travel inside these
//! structs with `success: false`; only fatal conditions become errors.

use super::day_summary::DailyReviewSummary;
use super::time_entry::{FlagSet, ReviewStatus};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Fail with "missing required fields" naming every blank field.
pub fn require_fields(fields: &[(&str, &str)]) -> AppResult<()> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| *k)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::MissingFields(missing.join(", ")))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub activity_id: String,
    #[serde(default)]
    pub scanned_by: String,
}

impl CheckInRequest {
    pub fn validate(&self) -> AppResult<()> {
        require_fields(&[
            ("studentId", &self.student_id),
            ("eventId", &self.event_id),
            ("activityId", &self.activity_id),
            ("scannedBy", &self.scanned_by),
        ])
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckInResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<i64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "FlagSet::is_empty")]
    pub flags: FlagSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_status: Option<ReviewStatus>,
}

impl CheckInResponse {
    pub fn duplicate() -> Self {
        Self {
            success: false,
            duplicate: true,
            error: Some("Already checked in".to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutRequest {
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub scanned_by: String,
}

impl CheckOutRequest {
    pub fn validate(&self) -> AppResult<()> {
        require_fields(&[
            ("studentId", &self.student_id),
            ("eventId", &self.event_id),
            ("scannedBy", &self.scanned_by),
        ])
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_worked: Option<f64>,
    #[serde(default, skip_serializing_if = "FlagSet::is_empty")]
    pub flags: FlagSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckOutResponse {
    pub fn not_checked_in() -> Self {
        Self {
            success: false,
            error: Some("Not checked in".to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceCheckOutRequest {
    #[serde(default)]
    pub entry_id: i64,
    /// `YYYY-MM-DD HH:MM[:SS]`
    #[serde(default)]
    pub check_out_time: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ForceCheckOutResponse {
    pub success: bool,
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub hours_worked: f64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub already_checked_out: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ForceCheckOutResponse {
    /// The entry was closed before this request got to it.
    pub fn already_checked_out(student_name: impl Into<String>) -> Self {
        Self {
            success: false,
            student_name: student_name.into(),
            already_checked_out: true,
            error: Some("Already checked out".to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceAllRequest {
    #[serde(default)]
    pub event_id: String,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ForceAllResponse {
    pub success: bool,
    pub checked_out_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub date: String,
}

/// Body of `getDailyReviewSummary`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub success: bool,
    pub summary: DailyReviewSummary,
}

impl From<DailyReviewSummary> for SummaryResponse {
    fn from(summary: DailyReviewSummary) -> Self {
        Self {
            success: true,
            summary,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditEntryRequest {
    pub entry_id: i64,
    #[serde(default)]
    pub check_in_time: Option<String>,
    #[serde(default)]
    pub check_out_time: Option<String>,
    #[serde(default)]
    pub reason: String,
}
