pub mod attendance;
pub mod calculator;
pub mod log;
pub mod reconcile;
pub mod roster;
