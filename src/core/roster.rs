//! Seeding of the read-only roster (students, events, activities).

use crate::db::log::ttlog_quiet;
use crate::db::pool::DbPool;
use crate::db::queries::{upsert_activity, upsert_event, upsert_student};
use crate::errors::{AppError, AppResult};
use crate::models::roster::Activity;
use crate::utils::time::parse_time_arg;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct RosterFile {
    #[serde(default)]
    pub students: Vec<StudentDef>,
    #[serde(default)]
    pub events: Vec<EventDef>,
}

#[derive(Debug, Deserialize)]
pub struct StudentDef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct EventDef {
    pub id: String,
    pub name: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub activities: Vec<ActivityDef>,
}

#[derive(Debug, Deserialize)]
pub struct ActivityDef {
    pub id: String,
    pub name: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    pub students: usize,
    pub events: usize,
    pub activities: usize,
}

pub struct RosterLogic;

impl RosterLogic {
    pub fn add_student(pool: &mut DbPool, id: &str, name: &str) -> AppResult<()> {
        if id.trim().is_empty() || name.trim().is_empty() {
            return Err(AppError::MissingFields("id, name".to_string()));
        }
        upsert_student(&pool.conn, id, name)?;
        ttlog_quiet(&pool.conn, "roster", id, &format!("student '{}'", name));
        Ok(())
    }

    pub fn add_event(pool: &mut DbPool, id: &str, name: &str, start: &str, end: &str) -> AppResult<()> {
        let start = parse_time_arg(start)?;
        let end = parse_time_arg(end)?;
        upsert_event(&pool.conn, id, name, &start, &end)?;
        ttlog_quiet(
            &pool.conn,
            "roster",
            id,
            &format!("event '{}' {}-{}", name, start.format("%H:%M"), end.format("%H:%M")),
        );
        Ok(())
    }

    pub fn add_activity(
        pool: &mut DbPool,
        event_id: &str,
        id: &str,
        name: &str,
        start: &str,
        end: &str,
    ) -> AppResult<()> {
        let activity = Activity {
            id: id.to_string(),
            event_id: event_id.to_string(),
            name: name.to_string(),
            start_time: parse_time_arg(start)?,
            end_time: parse_time_arg(end)?,
        };
        if crate::db::queries::get_event(&pool.conn, event_id)?.is_none() {
            return Err(AppError::EventNotFound(event_id.to_string()));
        }
        upsert_activity(&pool.conn, &activity)?;
        ttlog_quiet(
            &pool.conn,
            "roster",
            &format!("{}/{}", event_id, id),
            &format!("activity '{}'", name),
        );
        Ok(())
    }

    /// Load a YAML roster file, upserting everything in one transaction.
    pub fn import_file(pool: &mut DbPool, path: &Path) -> AppResult<ImportStats> {
        let content = fs::read_to_string(path)?;
        let roster: RosterFile = serde_yaml::from_str(&content)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;

        let tx = pool.conn.transaction()?;
        let mut stats = ImportStats::default();

        for s in &roster.students {
            upsert_student(&tx, &s.id, &s.name)?;
            stats.students += 1;
        }

        for ev in &roster.events {
            let start = parse_time_arg(&ev.start_time)?;
            let end = parse_time_arg(&ev.end_time)?;
            upsert_event(&tx, &ev.id, &ev.name, &start, &end)?;
            stats.events += 1;

            for a in &ev.activities {
                upsert_activity(
                    &tx,
                    &Activity {
                        id: a.id.clone(),
                        event_id: ev.id.clone(),
                        name: a.name.clone(),
                        start_time: parse_time_arg(&a.start_time)?,
                        end_time: parse_time_arg(&a.end_time)?,
                    },
                )?;
                stats.activities += 1;
            }
        }

        ttlog_quiet(
            &tx,
            "roster",
            &path.display().to_string(),
            &format!(
                "imported {} students, {} events, {} activities",
                stats.students, stats.events, stats.activities
            ),
        );
        tx.commit()?;

        tracing::info!(?stats, "roster imported");
        Ok(stats)
    }
}
