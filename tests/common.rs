#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rattendance::db::migrate::run_pending_migrations;
use rattendance::db::pool::DbPool;
use rattendance::db::queries::{upsert_activity, upsert_event, upsert_student};
use rattendance::models::roster::Activity;
use std::path::PathBuf;
use tempfile::TempDir;

pub const EVENT: &str = "food-drive";
pub const MORNING: &str = "sorting";
pub const AFTERNOON: &str = "packing";

pub fn rti() -> Command {
    cargo_bin_cmd!("rattendance")
}

/// Scratch home directory with its own database and offline queue.
pub struct TestEnv {
    pub dir: TempDir,
    pub db: String,
    pub queue: String,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = dir.path().join("attendance.sqlite").to_string_lossy().to_string();
        let queue = dir.path().join("queue.sqlite").to_string_lossy().to_string();
        Self { dir, db, queue }
    }

    pub fn home(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Command bound to this environment (config dir, db and queue paths).
    pub fn cmd(&self) -> Command {
        let mut cmd = rti();
        cmd.env("RATTENDANCE_HOME", self.dir.path())
            .env_remove("RUST_LOG")
            .args(["--db", &self.db, "--queue-db", &self.queue]);
        cmd
    }

    pub fn init(&self) {
        self.cmd().args(["--test", "init"]).assert().success();
    }
}

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
}

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date")
}

pub fn at(h: u32, m: u32) -> NaiveDateTime {
    day().and_time(t(h, m))
}

/// Event 09:00-17:00 with a morning activity ending 12:00 and an afternoon
/// one ending 15:00; three students.
pub fn seed_roster(pool: &DbPool) {
    let conn = &pool.conn;
    upsert_student(conn, "s1", "Ada Lovelace").expect("student");
    upsert_student(conn, "s2", "Grace Hopper").expect("student");
    upsert_student(conn, "s3", "Alan Turing").expect("student");

    upsert_event(conn, EVENT, "Food Drive", &t(9, 0), &t(17, 0)).expect("event");
    upsert_activity(
        conn,
        &Activity {
            id: MORNING.to_string(),
            event_id: EVENT.to_string(),
            name: "Sorting".to_string(),
            start_time: t(9, 0),
            end_time: t(12, 0),
        },
    )
    .expect("activity");
    upsert_activity(
        conn,
        &Activity {
            id: AFTERNOON.to_string(),
            event_id: EVENT.to_string(),
            name: "Packing".to_string(),
            start_time: t(13, 0),
            end_time: t(15, 0),
        },
    )
    .expect("activity");
}

pub fn seeded_pool() -> DbPool {
    let pool = DbPool::in_memory().expect("in-memory db");
    run_pending_migrations(&pool.conn).expect("migrations");
    seed_roster(&pool);
    pool
}

pub const ROSTER_YAML: &str = r#"
students:
  - id: s1
    name: Ada Lovelace
  - id: s2
    name: Grace Hopper
events:
  - id: food-drive
    name: Food Drive
    start_time: "09:00"
    end_time: "17:00"
    activities:
      - id: sorting
        name: Sorting
        start_time: "09:00"
        end_time: "12:00"
      - id: packing
        name: Packing
        start_time: "13:00"
        end_time: "15:00"
"#;
