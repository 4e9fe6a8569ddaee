pub mod flags;
pub mod hours;
