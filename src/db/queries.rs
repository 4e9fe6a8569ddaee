use crate::errors::{AppError, AppResult};
use crate::models::change_log::{ChangeRecord, ChangeType};
use crate::models::day_summary::DailyReviewSummary;
use crate::models::roster::{Activity, Event, Student};
use crate::models::time_entry::{
    FlagSet, ReviewStatus, TimeEntry, flags_from_db, flags_to_db,
};
use crate::utils::time::{DB_DATETIME_FMT, format_datetime};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{Connection, OptionalExtension, Result, Row, params};

const ENTRY_COLUMNS: &str = "id, student_id, event_id, activity_id, check_in_time, check_out_time, \
     hours_worked, flags, review_status, check_in_method, scanned_by, check_out_scanned_by, \
     forced_checkout_reason, modification_reason";

fn conversion_error(idx: usize, err: AppError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn parse_db_datetime(idx: usize, s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DB_DATETIME_FMT)
        .map_err(|_| conversion_error(idx, AppError::InvalidTime(s.to_string())))
}

fn parse_db_time(idx: usize, s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|_| conversion_error(idx, AppError::InvalidTime(s.to_string())))
}

pub fn map_entry_row(row: &Row) -> Result<TimeEntry> {
    let check_in_str: String = row.get("check_in_time")?;
    let check_out_str: Option<String> = row.get("check_out_time")?;
    let status_str: String = row.get("review_status")?;
    let flags_str: String = row.get("flags")?;

    let check_in_time = parse_db_datetime(4, &check_in_str)?;
    let check_out_time = match check_out_str {
        Some(s) => Some(parse_db_datetime(5, &s)?),
        None => None,
    };

    let review_status = ReviewStatus::from_db_str(&status_str).ok_or_else(|| {
        conversion_error(
            8,
            AppError::Other(format!("Invalid review status: {}", status_str)),
        )
    })?;

    Ok(TimeEntry {
        id: row.get("id")?,
        student_id: row.get("student_id")?,
        event_id: row.get("event_id")?,
        activity_id: row.get("activity_id")?,
        check_in_time,
        check_out_time,
        hours_worked: row.get("hours_worked")?,
        flags: flags_from_db(&flags_str),
        review_status,
        check_in_method: row.get("check_in_method")?,
        scanned_by: row.get("scanned_by")?,
        check_out_scanned_by: row.get("check_out_scanned_by")?,
        forced_checkout_reason: row.get("forced_checkout_reason")?,
        modification_reason: row.get("modification_reason")?,
    })
}

// ---------------------------
// Time entries
// ---------------------------

pub struct NewEntry<'a> {
    pub student_id: &'a str,
    pub event_id: &'a str,
    pub activity_id: &'a str,
    pub check_in_time: NaiveDateTime,
    pub flags: &'a FlagSet,
    pub check_in_method: &'a str,
    pub scanned_by: &'a str,
}

pub fn insert_entry(conn: &Connection, e: &NewEntry) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO time_entries
            (student_id, event_id, activity_id, check_in_time, flags, review_status,
             check_in_method, scanned_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            e.student_id,
            e.event_id,
            e.activity_id,
            format_datetime(&e.check_in_time),
            flags_to_db(e.flags),
            ReviewStatus::for_flags(e.flags).to_db_str(),
            e.check_in_method,
            e.scanned_by,
            chrono::Local::now().to_rfc3339(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_entry(conn: &Connection, id: i64) -> AppResult<Option<TimeEntry>> {
    let sql = format!("SELECT {} FROM time_entries WHERE id = ?1", ENTRY_COLUMNS);
    let mut stmt = conn.prepare_cached(&sql)?;
    Ok(stmt.query_row([id], map_entry_row).optional()?)
}

pub fn find_open_entry(
    conn: &Connection,
    student_id: &str,
    event_id: &str,
) -> AppResult<Option<TimeEntry>> {
    let sql = format!(
        "SELECT {} FROM time_entries
         WHERE student_id = ?1 AND event_id = ?2 AND check_out_time IS NULL
         ORDER BY check_in_time DESC
         LIMIT 1",
        ENTRY_COLUMNS
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    Ok(stmt
        .query_row(params![student_id, event_id], map_entry_row)
        .optional()?)
}

pub fn count_open_entries(conn: &Connection, student_id: &str, event_id: &str) -> AppResult<i64> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM time_entries
         WHERE student_id = ?1 AND event_id = ?2 AND check_out_time IS NULL",
        params![student_id, event_id],
        |r| r.get(0),
    )?;
    Ok(n)
}

fn list_entries_where(
    conn: &Connection,
    event_id: &str,
    date: &NaiveDate,
    open_only: bool,
) -> AppResult<Vec<TimeEntry>> {
    let mut sql = format!(
        "SELECT {} FROM time_entries
         WHERE event_id = ?1 AND substr(check_in_time, 1, 10) = ?2",
        ENTRY_COLUMNS
    );
    if open_only {
        sql.push_str(" AND check_out_time IS NULL");
    }
    sql.push_str(" ORDER BY check_in_time ASC, id ASC");

    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(
        params![event_id, date.format("%Y-%m-%d").to_string()],
        map_entry_row,
    )?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Entries of an event whose check-in falls on `date`.
pub fn list_entries_for_day(
    conn: &Connection,
    event_id: &str,
    date: &NaiveDate,
) -> AppResult<Vec<TimeEntry>> {
    list_entries_where(conn, event_id, date, false)
}

pub fn list_open_entries_for_day(
    conn: &Connection,
    event_id: &str,
    date: &NaiveDate,
) -> AppResult<Vec<TimeEntry>> {
    list_entries_where(conn, event_id, date, true)
}

pub struct CloseEntry<'a> {
    pub id: i64,
    pub check_out_time: NaiveDateTime,
    pub hours_worked: f64,
    pub flags: &'a FlagSet,
    pub check_out_scanned_by: Option<&'a str>,
    pub forced_checkout_reason: Option<&'a str>,
}

/// Conditional write: only an entry that is still open gets closed.
/// Returns the number of rows updated (0 when someone closed it first).
pub fn close_entry(conn: &Connection, c: &CloseEntry) -> AppResult<usize> {
    let mut stmt = conn.prepare_cached(
        "UPDATE time_entries
         SET check_out_time = ?1,
             hours_worked = ?2,
             flags = ?3,
             review_status = ?4,
             check_out_scanned_by = COALESCE(?5, check_out_scanned_by),
             forced_checkout_reason = COALESCE(?6, forced_checkout_reason)
         WHERE id = ?7 AND check_out_time IS NULL",
    )?;
    let n = stmt.execute(params![
        format_datetime(&c.check_out_time),
        c.hours_worked,
        flags_to_db(c.flags),
        ReviewStatus::for_flags(c.flags).to_db_str(),
        c.check_out_scanned_by,
        c.forced_checkout_reason,
        c.id,
    ])?;
    Ok(n)
}

/// Overwrite times, hours and flags of an entry after a manual correction.
pub fn rewrite_entry(conn: &Connection, entry: &TimeEntry) -> AppResult<usize> {
    let n = conn.execute(
        "UPDATE time_entries
         SET check_in_time = ?1,
             check_out_time = ?2,
             hours_worked = ?3,
             flags = ?4,
             review_status = ?5,
             modification_reason = ?6
         WHERE id = ?7",
        params![
            format_datetime(&entry.check_in_time),
            entry.check_out_time.as_ref().map(format_datetime),
            entry.hours_worked,
            flags_to_db(&entry.flags),
            entry.review_status.to_db_str(),
            entry.modification_reason,
            entry.id,
        ],
    )?;
    Ok(n)
}

pub fn daily_summary(
    conn: &Connection,
    event_id: &str,
    date: &NaiveDate,
) -> AppResult<DailyReviewSummary> {
    let summary = conn.query_row(
        "SELECT
            COUNT(*),
            COALESCE(SUM(CASE WHEN flags <> '' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN check_out_time IS NULL THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN forced_checkout_reason IS NOT NULL
                               OR modification_reason IS NOT NULL THEN 1 ELSE 0 END), 0)
         FROM time_entries
         WHERE event_id = ?1 AND substr(check_in_time, 1, 10) = ?2",
        params![event_id, date.format("%Y-%m-%d").to_string()],
        |r| {
            Ok(DailyReviewSummary {
                total: r.get::<_, i64>(0)? as u64,
                flagged: r.get::<_, i64>(1)? as u64,
                no_checkout: r.get::<_, i64>(2)? as u64,
                modified: r.get::<_, i64>(3)? as u64,
            })
        },
    )?;
    Ok(summary)
}

// ---------------------------
// Change log
// ---------------------------

pub fn insert_change(conn: &Connection, rec: &ChangeRecord) -> AppResult<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO change_log (entry_id, type, actor, reason, timestamp, details)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    stmt.execute(params![
        rec.entry_id,
        rec.change_type.to_db_str(),
        rec.actor,
        rec.reason,
        format_datetime(&rec.timestamp),
        rec.details,
    ])?;
    Ok(())
}

pub fn load_change_log(conn: &Connection, entry_id: i64) -> AppResult<Vec<ChangeRecord>> {
    let mut stmt = conn.prepare_cached(
        "SELECT entry_id, type, actor, reason, timestamp, details
         FROM change_log WHERE entry_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map([entry_id], |row| {
        let type_str: String = row.get(1)?;
        let ts: String = row.get(4)?;
        let change_type = ChangeType::from_db_str(&type_str).ok_or_else(|| {
            conversion_error(1, AppError::Other(format!("Invalid change type: {}", type_str)))
        })?;
        Ok(ChangeRecord {
            entry_id: row.get(0)?,
            change_type,
            actor: row.get(2)?,
            reason: row.get(3)?,
            timestamp: parse_db_datetime(4, &ts)?,
            details: row.get(5)?,
        })
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

// ---------------------------
// Roster (read-only to the core; written by the `roster` command)
// ---------------------------

pub fn get_student(conn: &Connection, id: &str) -> AppResult<Option<Student>> {
    let mut stmt = conn.prepare_cached("SELECT id, name FROM students WHERE id = ?1")?;
    Ok(stmt
        .query_row([id], |r| {
            Ok(Student {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        })
        .optional()?)
}

pub fn get_event(conn: &Connection, id: &str) -> AppResult<Option<Event>> {
    let mut stmt =
        conn.prepare_cached("SELECT id, name, start_time, end_time FROM events WHERE id = ?1")?;
    let head = stmt
        .query_row([id], |r| {
            let start: String = r.get(2)?;
            let end: String = r.get(3)?;
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                parse_db_time(2, &start)?,
                parse_db_time(3, &end)?,
            ))
        })
        .optional()?;

    let Some((event_id, name, start_time, end_time)) = head else {
        return Ok(None);
    };

    let mut act_stmt = conn.prepare_cached(
        "SELECT id, event_id, name, start_time, end_time
         FROM activities WHERE event_id = ?1 ORDER BY start_time ASC",
    )?;
    let rows = act_stmt.query_map([&event_id], |r| {
        let start: String = r.get(3)?;
        let end: String = r.get(4)?;
        Ok(Activity {
            id: r.get(0)?,
            event_id: r.get(1)?,
            name: r.get(2)?,
            start_time: parse_db_time(3, &start)?,
            end_time: parse_db_time(4, &end)?,
        })
    })?;

    let mut activities = Vec::new();
    for r in rows {
        activities.push(r?);
    }

    Ok(Some(Event {
        id: event_id,
        name,
        start_time,
        end_time,
        activities,
    }))
}

pub fn upsert_student(conn: &Connection, id: &str, name: &str) -> AppResult<()> {
    conn.execute(
        "INSERT INTO students (id, name) VALUES (?1, ?2)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        params![id, name],
    )?;
    Ok(())
}

pub fn upsert_event(
    conn: &Connection,
    id: &str,
    name: &str,
    start: &NaiveTime,
    end: &NaiveTime,
) -> AppResult<()> {
    conn.execute(
        "INSERT INTO events (id, name, start_time, end_time) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            start_time = excluded.start_time,
            end_time = excluded.end_time",
        params![
            id,
            name,
            start.format("%H:%M").to_string(),
            end.format("%H:%M").to_string()
        ],
    )?;
    Ok(())
}

pub fn upsert_activity(conn: &Connection, a: &Activity) -> AppResult<()> {
    conn.execute(
        "INSERT INTO activities (id, event_id, name, start_time, end_time)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(event_id, id) DO UPDATE SET
            name = excluded.name,
            start_time = excluded.start_time,
            end_time = excluded.end_time",
        params![
            a.id,
            a.event_id,
            a.name,
            a.start_time.format("%H:%M").to_string(),
            a.end_time.format("%H:%M").to_string()
        ],
    )?;
    Ok(())
}

pub fn list_students(conn: &Connection) -> AppResult<Vec<Student>> {
    let mut stmt = conn.prepare_cached("SELECT id, name FROM students ORDER BY id ASC")?;
    let rows = stmt.query_map([], |r| {
        Ok(Student {
            id: r.get(0)?,
            name: r.get(1)?,
        })
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn list_events(conn: &Connection) -> AppResult<Vec<Event>> {
    let ids: Vec<String> = {
        let mut stmt = conn.prepare_cached("SELECT id FROM events ORDER BY id ASC")?;
        let rows = stmt.query_map([], |r| r.get(0))?;
        let mut ids = Vec::new();
        for r in rows {
            ids.push(r?);
        }
        ids
    };

    let mut out = Vec::new();
    for id in ids {
        if let Some(ev) = get_event(conn, &id)? {
            out.push(ev);
        }
    }
    Ok(out)
}
