//! Durable client-side store of attendance intents that could not reach the
//! server. One SQLite file, one table per intent kind.

use crate::errors::AppResult;
use crate::models::intent_kind::IntentKind;
use crate::models::pending_intent::{NewIntent, PendingCounts, PendingIntent};
use crate::utils::time::{DB_DATETIME_FMT, format_datetime};
use chrono::NaiveDateTime;
use rusqlite::{Connection, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const KINDS: [IntentKind; 2] = [IntentKind::CheckIn, IntentKind::CheckOut];

pub struct OfflineQueue {
    conn: Mutex<Connection>,
}

fn create_schema(conn: &Connection) -> rusqlite::Result<()> {
    for kind in KINDS {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                local_id     INTEGER PRIMARY KEY AUTOINCREMENT,
                subject_id   TEXT NOT NULL,
                event_id     TEXT NOT NULL,
                activity_id  TEXT,
                scanned_by   TEXT NOT NULL,
                enqueued_at  TEXT NOT NULL
            );",
            table = kind.queue_table()
        ))?;
    }
    Ok(())
}

fn map_intent(kind: IntentKind, row: &Row) -> rusqlite::Result<PendingIntent> {
    let enqueued: String = row.get("enqueued_at")?;
    let enqueued_at = NaiveDateTime::parse_from_str(&enqueued, DB_DATETIME_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(PendingIntent {
        local_id: row.get("local_id")?,
        kind,
        subject_id: row.get("subject_id")?,
        event_id: row.get("event_id")?,
        activity_id: row.get("activity_id")?,
        scanned_by: row.get("scanned_by")?,
        enqueued_at,
    })
}

impl OfflineQueue {
    pub fn open(path: &str) -> AppResult<Self> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        create_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()?;
        create_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Persist an intent; returns its monotonically increasing local id.
    pub fn enqueue(&self, kind: IntentKind, intent: &NewIntent) -> AppResult<i64> {
        let conn = self.conn();
        let stamped = intent.stamped(0, kind);
        conn.execute(
            &format!(
                "INSERT INTO {} (subject_id, event_id, activity_id, scanned_by, enqueued_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                kind.queue_table()
            ),
            params![
                stamped.subject_id,
                stamped.event_id,
                stamped.activity_id,
                stamped.scanned_by,
                format_datetime(&stamped.enqueued_at),
            ],
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!(%kind, local_id = id, subject = %stamped.subject_id, "intent queued");
        Ok(id)
    }

    /// Snapshot of the pending intents of one kind, oldest first. Calling it
    /// again restarts from the current head of the queue.
    pub fn list_pending(&self, kind: IntentKind) -> AppResult<Vec<PendingIntent>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT local_id, subject_id, event_id, activity_id, scanned_by, enqueued_at
             FROM {} ORDER BY local_id ASC",
            kind.queue_table()
        ))?;
        let rows = stmt.query_map([], |r| map_intent(kind, r))?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Returns whether a row was actually deleted.
    pub fn remove(&self, kind: IntentKind, local_id: i64) -> AppResult<bool> {
        let n = self.conn().execute(
            &format!("DELETE FROM {} WHERE local_id = ?1", kind.queue_table()),
            [local_id],
        )?;
        Ok(n > 0)
    }

    pub fn counts(&self) -> AppResult<PendingCounts> {
        let conn = self.conn();
        let mut per_kind = [0u64; 2];
        for (slot, kind) in per_kind.iter_mut().zip(KINDS) {
            let n: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM {}", kind.queue_table()),
                [],
                |r| r.get(0),
            )?;
            *slot = n as u64;
        }
        Ok(PendingCounts::new(per_kind[0], per_kind[1]))
    }

    /// Drop every pending intent of one kind. Returns how many were removed.
    pub fn clear(&self, kind: IntentKind) -> AppResult<usize> {
        let n = self
            .conn()
            .execute(&format!("DELETE FROM {}", kind.queue_table()), [])?;
        tracing::info!(%kind, removed = n, "offline queue cleared");
        Ok(n)
    }
}
