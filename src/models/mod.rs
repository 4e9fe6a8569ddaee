pub mod attendance;
pub mod change_log;
pub mod day_summary;
pub mod intent_kind;
pub mod pending_intent;
pub mod roster;
pub mod time_entry;
