//! End-of-day reconciliation: admin corrections of entries that were never
//! closed or that carry wrong times. Every mutation appends a change record.

use crate::core::calculator::flags::FlagPolicy;
use crate::core::calculator::hours::calculate_hours;
use crate::db::log::ttlog_quiet;
use crate::db::pool::DbPool;
use crate::db::queries::{
    CloseEntry, close_entry, daily_summary, get_entry, get_event, get_student, insert_change,
    list_entries_for_day, list_open_entries_for_day, load_change_log, rewrite_entry,
};
use crate::errors::{AppError, AppResult};
use crate::models::attendance::{
    EditEntryRequest, ForceAllRequest, ForceAllResponse, ForceCheckOutRequest,
    ForceCheckOutResponse, SummaryRequest, require_fields,
};
use crate::models::change_log::{ChangeRecord, ChangeType};
use crate::models::day_summary::DailyReviewSummary;
use crate::models::time_entry::{ReviewStatus, TimeEntry};
use crate::utils::date::parse_date_or_today;
use crate::utils::time::{format_datetime, now, parse_datetime_arg};
use chrono::NaiveDate;

fn require_actor(actor: &str) -> AppResult<()> {
    if actor.trim().is_empty() {
        Err(AppError::Unauthenticated)
    } else {
        Ok(())
    }
}

fn parse_day(raw: &str) -> AppResult<NaiveDate> {
    parse_date_or_today(Some(raw))
}

/// Stored on bulk-closed entries when the admin gave no reason.
pub const DEFAULT_FORCE_ALL_REASON: &str = "end of day";

pub struct ReconcileLogic {
    policy: FlagPolicy,
}

impl Default for ReconcileLogic {
    fn default() -> Self {
        Self::new(FlagPolicy::default())
    }
}

impl ReconcileLogic {
    pub fn new(policy: FlagPolicy) -> Self {
        Self { policy }
    }

    /// Close one open entry at an admin-supplied time.
    pub fn force_check_out(
        &self,
        pool: &mut DbPool,
        req: &ForceCheckOutRequest,
        actor: &str,
    ) -> AppResult<ForceCheckOutResponse> {
        require_actor(actor)?;
        require_fields(&[("checkOutTime", &req.check_out_time), ("reason", &req.reason)])?;
        if req.entry_id <= 0 {
            return Err(AppError::MissingFields("entryId".to_string()));
        }
        let check_out = parse_datetime_arg(&req.check_out_time)?;

        let tx = pool.conn.transaction()?;

        let entry = get_entry(&tx, req.entry_id)?.ok_or(AppError::EntryNotFound(req.entry_id))?;
        let student_name = get_student(&tx, &entry.student_id)?
            .map(|s| s.name)
            .unwrap_or_else(|| entry.student_id.clone());

        if !entry.is_open() {
            tracing::info!(entry_id = entry.id, "forced check-out of a closed entry");
            return Ok(ForceCheckOutResponse::already_checked_out(student_name));
        }

        let hours = calculate_hours(entry.check_in_time, check_out);
        let flags = match get_event(&tx, &entry.event_id)? {
            Some(event) => {
                let schedule = event.schedule_for(&entry.activity_id);
                let date = entry.check_in_date();
                self.policy.flags(
                    entry.check_in_time,
                    Some(check_out),
                    schedule.start_on(date),
                    schedule.end_on(date),
                )
            }
            None => entry.flags.clone(),
        };

        let closed = close_entry(
            &tx,
            &CloseEntry {
                id: entry.id,
                check_out_time: check_out,
                hours_worked: hours.rounded,
                flags: &flags,
                check_out_scanned_by: None,
                forced_checkout_reason: Some(&req.reason),
            },
        )?;
        if closed == 0 {
            return Ok(ForceCheckOutResponse::already_checked_out(student_name));
        }

        insert_change(
            &tx,
            &ChangeRecord {
                entry_id: entry.id,
                change_type: ChangeType::ForceCheckout,
                actor: actor.to_string(),
                reason: req.reason.clone(),
                timestamp: now(),
                details: format!("check-out set to {}", format_datetime(&check_out)),
            },
        )?;
        ttlog_quiet(
            &tx,
            "force_checkout",
            &entry.id.to_string(),
            &format!("by {}: {}", actor, req.reason),
        );
        tx.commit()?;

        tracing::info!(entry_id = entry.id, actor, hours = hours.rounded, "forced check-out");

        Ok(ForceCheckOutResponse {
            success: true,
            student_name,
            hours_worked: hours.rounded,
            ..Default::default()
        })
    }

    /// Close every open entry of an event/day at its own activity's scheduled
    /// end, all in one transaction.
    pub fn force_all_check_out(
        &self,
        pool: &mut DbPool,
        req: &ForceAllRequest,
        actor: &str,
    ) -> AppResult<ForceAllResponse> {
        require_actor(actor)?;
        require_fields(&[("eventId", &req.event_id), ("date", &req.date)])?;
        let date = parse_day(&req.date)?;
        let reason = match req.reason.trim() {
            "" => DEFAULT_FORCE_ALL_REASON,
            r => r,
        };

        let tx = pool.conn.transaction()?;

        let event =
            get_event(&tx, &req.event_id)?.ok_or_else(|| AppError::EventNotFound(req.event_id.clone()))?;
        let open = list_open_entries_for_day(&tx, &event.id, &date)?;
        let stamp = now();
        let mut count = 0u64;

        for entry in &open {
            let schedule = event.schedule_for(&entry.activity_id);
            let day = entry.check_in_date();
            let check_out = schedule.end_on(day);
            let hours = calculate_hours(entry.check_in_time, check_out);
            let flags = self.policy.flags(
                entry.check_in_time,
                Some(check_out),
                schedule.start_on(day),
                check_out,
            );

            let closed = close_entry(
                &tx,
                &CloseEntry {
                    id: entry.id,
                    check_out_time: check_out,
                    hours_worked: hours.rounded,
                    flags: &flags,
                    check_out_scanned_by: None,
                    forced_checkout_reason: Some(reason),
                },
            )?;
            if closed == 0 {
                continue;
            }

            insert_change(
                &tx,
                &ChangeRecord {
                    entry_id: entry.id,
                    change_type: ChangeType::ForceCheckout,
                    actor: actor.to_string(),
                    reason: reason.to_string(),
                    timestamp: stamp,
                    details: format!(
                        "bulk check-out at scheduled end {}",
                        format_datetime(&check_out)
                    ),
                },
            )?;
            count += 1;
        }

        ttlog_quiet(
            &tx,
            "force_all",
            &event.id,
            &format!("{} entries closed for {} by {}", count, date, actor),
        );
        tx.commit()?;

        tracing::info!(event = %event.id, %date, count, actor, "forced check-out of all open entries");

        Ok(ForceAllResponse {
            success: true,
            checked_out_count: count,
        })
    }

    pub fn daily_review_summary(
        &self,
        pool: &mut DbPool,
        req: &SummaryRequest,
    ) -> AppResult<DailyReviewSummary> {
        require_fields(&[("eventId", &req.event_id), ("date", &req.date)])?;
        let date = parse_day(&req.date)?;
        if get_event(&pool.conn, &req.event_id)?.is_none() {
            return Err(AppError::EventNotFound(req.event_id.clone()));
        }
        daily_summary(&pool.conn, &req.event_id, &date)
    }

    /// Manual correction of an entry's times. Hours and flags are recomputed.
    pub fn edit_entry(
        &self,
        pool: &mut DbPool,
        req: &EditEntryRequest,
        actor: &str,
    ) -> AppResult<TimeEntry> {
        require_actor(actor)?;
        require_fields(&[("reason", &req.reason)])?;
        if req.check_in_time.is_none() && req.check_out_time.is_none() {
            return Err(AppError::MissingFields(
                "checkInTime or checkOutTime".to_string(),
            ));
        }

        let tx = pool.conn.transaction()?;
        let mut entry =
            get_entry(&tx, req.entry_id)?.ok_or(AppError::EntryNotFound(req.entry_id))?;
        let before = describe_times(&entry);

        if let Some(raw) = &req.check_in_time {
            entry.check_in_time = parse_datetime_arg(raw)?;
        }
        if let Some(raw) = &req.check_out_time {
            entry.check_out_time = Some(parse_datetime_arg(raw)?);
        }

        entry.hours_worked = entry
            .check_out_time
            .map(|out| calculate_hours(entry.check_in_time, out).rounded);

        if let Some(event) = get_event(&tx, &entry.event_id)? {
            let schedule = event.schedule_for(&entry.activity_id);
            let day = entry.check_in_date();
            entry.flags = self.policy.flags(
                entry.check_in_time,
                entry.check_out_time,
                schedule.start_on(day),
                schedule.end_on(day),
            );
        }
        entry.review_status = ReviewStatus::for_flags(&entry.flags);
        entry.modification_reason = Some(req.reason.clone());

        rewrite_entry(&tx, &entry)?;
        insert_change(
            &tx,
            &ChangeRecord {
                entry_id: entry.id,
                change_type: ChangeType::ManualEdit,
                actor: actor.to_string(),
                reason: req.reason.clone(),
                timestamp: now(),
                details: format!("{} -> {}", before, describe_times(&entry)),
            },
        )?;
        ttlog_quiet(
            &tx,
            "edit",
            &entry.id.to_string(),
            &format!("by {}: {}", actor, req.reason),
        );
        tx.commit()?;

        tracing::info!(entry_id = entry.id, actor, "entry edited");
        Ok(entry)
    }

    pub fn list_daily_entries(
        &self,
        pool: &mut DbPool,
        event_id: &str,
        date: &NaiveDate,
    ) -> AppResult<Vec<TimeEntry>> {
        list_entries_for_day(&pool.conn, event_id, date)
    }

    pub fn change_log(&self, pool: &mut DbPool, entry_id: i64) -> AppResult<Vec<ChangeRecord>> {
        if get_entry(&pool.conn, entry_id)?.is_none() {
            return Err(AppError::EntryNotFound(entry_id));
        }
        load_change_log(&pool.conn, entry_id)
    }
}

fn describe_times(entry: &TimeEntry) -> String {
    format!(
        "{}..{}",
        format_datetime(&entry.check_in_time),
        entry
            .check_out_time
            .as_ref()
            .map(format_datetime)
            .unwrap_or_else(|| "open".to_string())
    )
}
