use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    CheckOut,
    ForceCheckout,
    ManualEdit,
}

impl ChangeType {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ChangeType::CheckOut => "check_out",
            ChangeType::ForceCheckout => "force_checkout",
            ChangeType::ManualEdit => "manual_edit",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "check_out" => Some(ChangeType::CheckOut),
            "force_checkout" => Some(ChangeType::ForceCheckout),
            "manual_edit" => Some(ChangeType::ManualEdit),
            _ => None,
        }
    }
}

/// One append-only audit record attached to a time entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    pub entry_id: i64,
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    pub actor: String,
    pub reason: String,
    pub timestamp: NaiveDateTime,
    pub details: String,
}
