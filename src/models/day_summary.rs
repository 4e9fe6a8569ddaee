use serde::{Deserialize, Serialize};

/// Read-only aggregate over one event/day, used by the end-of-day review.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReviewSummary {
    pub total: u64,
    pub flagged: u64,
    pub no_checkout: u64,
    pub modified: u64,
}
