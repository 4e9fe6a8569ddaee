//! Read-only roster rows consumed by the attendance core: students, events
//! and their scheduled activities.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Student {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Activity {
    pub id: String,
    pub event_id: String,
    pub name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub activities: Vec<Activity>,
}

/// Typical start/end used for flag thresholds and checkout defaulting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Schedule {
    pub fn start_on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.start)
    }

    pub fn end_on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.end)
    }
}

impl Event {
    pub fn activity(&self, activity_id: &str) -> Option<&Activity> {
        self.activities.iter().find(|a| a.id == activity_id)
    }

    /// Schedule of the given activity, falling back to the event's own times
    /// when the activity is not part of this event.
    pub fn schedule_for(&self, activity_id: &str) -> Schedule {
        match self.activity(activity_id) {
            Some(a) => Schedule {
                start: a.start_time,
                end: a.end_time,
            },
            None => Schedule {
                start: self.start_time,
                end: self.end_time,
            },
        }
    }
}
