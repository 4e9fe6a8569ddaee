use serde::{Deserialize, Serialize};

/// Direction of an attendance scan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    CheckIn,
    CheckOut,
}

impl IntentKind {
    pub fn ik_as_str(&self) -> &'static str {
        match self {
            IntentKind::CheckIn => "check-in",
            IntentKind::CheckOut => "check-out",
        }
    }

    /// Name of the offline queue table holding intents of this kind.
    pub fn queue_table(&self) -> &'static str {
        match self {
            IntentKind::CheckIn => "pending_check_ins",
            IntentKind::CheckOut => "pending_check_outs",
        }
    }
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.ik_as_str())
    }
}
