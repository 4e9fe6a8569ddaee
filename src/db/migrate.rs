use rusqlite::{Connection, OptionalExtension, Result};

/// Ensure that the `log` table exists; it also records applied migrations.
fn ensure_log_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS log (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            date      TEXT NOT NULL,
            operation TEXT NOT NULL,
            target    TEXT DEFAULT '',
            message   TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn migration_applied(conn: &Connection, version: &str) -> Result<bool> {
    let mut chk = conn.prepare(
        "SELECT 1 FROM log
         WHERE operation = 'migration_applied' AND target = ?1
         LIMIT 1",
    )?;
    Ok(chk.query_row([version], |_| Ok(())).optional()?.is_some())
}

fn mark_applied(conn: &Connection, version: &str, message: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO log (date, operation, target, message)
         VALUES (datetime('now'), 'migration_applied', ?1, ?2)",
        [version, message],
    )?;
    tracing::info!(version, "migration applied: {}", message);
    Ok(())
}

/// Check if `table` has a column named `column`.
fn table_has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info('{}')", table))?;
    let cols = stmt.query_map([], |row| row.get::<_, String>(1))?;

    for c in cols {
        if c? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Roster tables: read-only to the attendance core.
fn create_roster_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS students (
            id    TEXT PRIMARY KEY,
            name  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS events (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            start_time  TEXT NOT NULL,   -- HH:MM
            end_time    TEXT NOT NULL    -- HH:MM
        );

        CREATE TABLE IF NOT EXISTS activities (
            id          TEXT NOT NULL,
            event_id    TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
            name        TEXT NOT NULL,
            start_time  TEXT NOT NULL,   -- HH:MM
            end_time    TEXT NOT NULL,   -- HH:MM
            PRIMARY KEY (event_id, id)
        );
        "#,
    )
}

fn create_time_entries(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS time_entries (
            id                      INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id              TEXT NOT NULL,
            event_id                TEXT NOT NULL,
            activity_id             TEXT NOT NULL,
            check_in_time           TEXT NOT NULL,   -- YYYY-MM-DD HH:MM:SS
            check_out_time          TEXT,
            hours_worked            REAL,
            flags                   TEXT NOT NULL DEFAULT '',
            review_status           TEXT NOT NULL DEFAULT 'normal'
                                    CHECK (review_status IN ('normal','flagged')),
            check_in_method         TEXT NOT NULL DEFAULT 'av_scan',
            scanned_by              TEXT NOT NULL,
            forced_checkout_reason  TEXT,
            modification_reason     TEXT,
            created_at              TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_entries_event_checkin
            ON time_entries(event_id, check_in_time);

        CREATE TABLE IF NOT EXISTS change_log (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            entry_id   INTEGER NOT NULL REFERENCES time_entries(id),
            type       TEXT NOT NULL
                       CHECK (type IN ('check_out','force_checkout','manual_edit')),
            actor      TEXT NOT NULL,
            reason     TEXT NOT NULL DEFAULT '',
            timestamp  TEXT NOT NULL,
            details    TEXT NOT NULL DEFAULT ''
        );

        CREATE INDEX IF NOT EXISTS idx_change_log_entry ON change_log(entry_id);
        "#,
    )
}

/// At most one open entry per (student, event): enforced by the store, on
/// top of the read-before-write check done by the service.
fn create_open_entry_index(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_entries_one_open
            ON time_entries(student_id, event_id)
            WHERE check_out_time IS NULL;
        "#,
    )
}

fn add_check_out_scanned_by(conn: &Connection) -> Result<()> {
    if !table_has_column(conn, "time_entries", "check_out_scanned_by")? {
        conn.execute(
            "ALTER TABLE time_entries ADD COLUMN check_out_scanned_by TEXT;",
            [],
        )?;
    }
    Ok(())
}

type Migration = (&'static str, &'static str, fn(&Connection) -> Result<()>);

const MIGRATIONS: &[Migration] = &[
    (
        "20260301_0001_create_roster",
        "Created students, events and activities tables",
        create_roster_tables,
    ),
    (
        "20260301_0002_create_time_entries",
        "Created time_entries and change_log tables",
        create_time_entries,
    ),
    (
        "20260315_0003_open_entry_unique_index",
        "Added partial unique index on open entries",
        create_open_entry_index,
    ),
    (
        "20260402_0004_add_check_out_scanned_by",
        "Added check_out_scanned_by to time_entries",
        add_check_out_scanned_by,
    ),
];

/// Public entry point: run all pending migrations, each in its own transaction.
pub fn run_pending_migrations(conn: &Connection) -> Result<()> {
    ensure_log_table(conn)?;

    for &(version, message, apply) in MIGRATIONS {
        if migration_applied(conn, version)? {
            continue;
        }

        conn.execute_batch("BEGIN IMMEDIATE;")?;
        let outcome = apply(conn).and_then(|_| mark_applied(conn, version, message));
        match outcome {
            Ok(()) => conn.execute_batch("COMMIT;")?,
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK;");
                tracing::error!(version, error = %e, "migration failed");
                return Err(e);
            }
        }
    }

    Ok(())
}

/// Number of migrations recorded in the `log` table.
pub fn applied_count(conn: &Connection) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM log WHERE operation = 'migration_applied'",
        [],
        |r| r.get(0),
    )
}

pub fn known_migrations() -> usize {
    MIGRATIONS.len()
}
