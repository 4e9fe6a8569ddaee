use crate::config::Config;
use crate::core::calculator::flags::FlagPolicy;
use crate::core::calculator::hours::calculate_hours;
use crate::db::log::ttlog_quiet;
use crate::db::pool::DbPool;
use crate::db::queries::{
    CloseEntry, NewEntry, close_entry, find_open_entry, get_event, get_student, insert_change,
    insert_entry,
};
use crate::errors::{AppError, AppResult};
use crate::models::attendance::{CheckInRequest, CheckInResponse, CheckOutRequest, CheckOutResponse};
use crate::models::change_log::{ChangeRecord, ChangeType};
use crate::models::time_entry::{DEFAULT_CHECK_IN_METHOD, ReviewStatus};
use crate::utils::time::format_datetime;
use chrono::NaiveDateTime;

fn is_open_entry_conflict(e: &AppError) -> bool {
    matches!(
        e,
        AppError::Db(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Scan-driven check-in/check-out against the server store.
#[derive(Debug, Clone)]
pub struct AttendanceService {
    policy: FlagPolicy,
    check_in_method: String,
}

impl Default for AttendanceService {
    fn default() -> Self {
        Self {
            policy: FlagPolicy::default(),
            check_in_method: DEFAULT_CHECK_IN_METHOD.to_string(),
        }
    }
}

impl AttendanceService {
    pub fn new(policy: FlagPolicy, check_in_method: impl Into<String>) -> Self {
        Self {
            policy,
            check_in_method: check_in_method.into(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.flag_policy(), cfg.default_check_in_method.clone())
    }

    pub fn policy(&self) -> FlagPolicy {
        self.policy
    }

    pub fn check_in(&self, pool: &mut DbPool, req: &CheckInRequest) -> AppResult<CheckInResponse> {
        self.check_in_at(pool, req, crate::utils::time::now())
    }

    /// Check-in with an explicit server time.
    pub fn check_in_at(
        &self,
        pool: &mut DbPool,
        req: &CheckInRequest,
        now: NaiveDateTime,
    ) -> AppResult<CheckInResponse> {
        req.validate()?;
        let conn = &pool.conn;

        if find_open_entry(conn, &req.student_id, &req.event_id)?.is_some() {
            tracing::info!(student = %req.student_id, event = %req.event_id, "duplicate check-in");
            return Ok(CheckInResponse::duplicate());
        }

        let student = get_student(conn, &req.student_id)?
            .ok_or_else(|| AppError::StudentNotFound(req.student_id.clone()))?;
        let event = get_event(conn, &req.event_id)?
            .ok_or_else(|| AppError::EventNotFound(req.event_id.clone()))?;

        let schedule = event.schedule_for(&req.activity_id);
        let date = now.date();
        let flags = self
            .policy
            .flags(now, None, schedule.start_on(date), schedule.end_on(date));

        let inserted = insert_entry(
            conn,
            &NewEntry {
                student_id: &req.student_id,
                event_id: &req.event_id,
                activity_id: &req.activity_id,
                check_in_time: now,
                flags: &flags,
                check_in_method: &self.check_in_method,
                scanned_by: &req.scanned_by,
            },
        );

        // A concurrent check-in may have slipped in between the read and the
        // insert; the partial unique index rejects the second open entry.
        let entry_id = match inserted {
            Ok(id) => id,
            Err(e) if is_open_entry_conflict(&e) => {
                tracing::info!(student = %req.student_id, event = %req.event_id, "duplicate check-in (constraint)");
                return Ok(CheckInResponse::duplicate());
            }
            Err(e) => return Err(e),
        };

        ttlog_quiet(
            conn,
            "check_in",
            &entry_id.to_string(),
            &format!(
                "{} checked in to {} at {}",
                student.id,
                event.id,
                format_datetime(&now)
            ),
        );
        tracing::info!(entry_id, student = %student.id, event = %event.id, ?flags, "checked in");

        let review_status = ReviewStatus::for_flags(&flags);
        Ok(CheckInResponse {
            success: true,
            student_name: Some(student.name),
            entry_id: Some(entry_id),
            flags,
            review_status: Some(review_status),
            ..Default::default()
        })
    }

    pub fn check_out(
        &self,
        pool: &mut DbPool,
        req: &CheckOutRequest,
    ) -> AppResult<CheckOutResponse> {
        self.check_out_at(pool, req, crate::utils::time::now())
    }

    pub fn check_out_at(
        &self,
        pool: &mut DbPool,
        req: &CheckOutRequest,
        now: NaiveDateTime,
    ) -> AppResult<CheckOutResponse> {
        req.validate()?;

        let tx = pool.conn.transaction()?;

        let Some(entry) = find_open_entry(&tx, &req.student_id, &req.event_id)? else {
            tracing::info!(student = %req.student_id, event = %req.event_id, "check-out without open entry");
            return Ok(CheckOutResponse::not_checked_in());
        };

        let student = get_student(&tx, &entry.student_id)?
            .ok_or_else(|| AppError::StudentNotFound(entry.student_id.clone()))?;
        let event = get_event(&tx, &entry.event_id)?
            .ok_or_else(|| AppError::EventNotFound(entry.event_id.clone()))?;

        let schedule = event.schedule_for(&entry.activity_id);
        let date = entry.check_in_date();
        let flags = self.policy.flags(
            entry.check_in_time,
            Some(now),
            schedule.start_on(date),
            schedule.end_on(date),
        );
        let hours = calculate_hours(entry.check_in_time, now);

        let closed = close_entry(
            &tx,
            &CloseEntry {
                id: entry.id,
                check_out_time: now,
                hours_worked: hours.rounded,
                flags: &flags,
                check_out_scanned_by: Some(&req.scanned_by),
                forced_checkout_reason: None,
            },
        )?;
        if closed == 0 {
            // Closed by someone else since the read.
            return Ok(CheckOutResponse::not_checked_in());
        }

        insert_change(
            &tx,
            &ChangeRecord {
                entry_id: entry.id,
                change_type: ChangeType::CheckOut,
                actor: req.scanned_by.clone(),
                reason: "scan".to_string(),
                timestamp: now,
                details: format!("{} minutes, {:.1} h", hours.minutes, hours.rounded),
            },
        )?;
        ttlog_quiet(
            &tx,
            "check_out",
            &entry.id.to_string(),
            &format!("{} checked out after {:.1} h", student.id, hours.rounded),
        );
        tx.commit()?;

        tracing::info!(entry_id = entry.id, hours = hours.rounded, ?flags, "checked out");

        Ok(CheckOutResponse {
            success: true,
            student_name: Some(student.name),
            entry_id: Some(entry.id),
            hours_worked: Some(hours.rounded),
            flags,
            error: None,
        })
    }
}
