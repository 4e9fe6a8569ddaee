mod common;
use common::{AFTERNOON, EVENT, MORNING, at, seeded_pool};

use rattendance::core::attendance::AttendanceService;
use rattendance::core::reconcile::ReconcileLogic;
use rattendance::db::pool::DbPool;
use rattendance::db::queries::get_entry;
use rattendance::errors::AppError;
use rattendance::models::attendance::{
    CheckInRequest, EditEntryRequest, ForceAllRequest, ForceCheckOutRequest, SummaryRequest,
};
use rattendance::models::change_log::ChangeType;
use rattendance::models::time_entry::{EntryFlag, ReviewStatus};

fn checked_in(pool: &mut DbPool, student: &str, activity: &str, h: u32, m: u32) -> i64 {
    let req = CheckInRequest {
        student_id: student.to_string(),
        event_id: EVENT.to_string(),
        activity_id: activity.to_string(),
        scanned_by: "op-1".to_string(),
    };
    AttendanceService::default()
        .check_in_at(pool, &req, at(h, m))
        .expect("check-in")
        .entry_id
        .expect("entry id")
}

fn force(entry_id: i64, when: &str) -> ForceCheckOutRequest {
    ForceCheckOutRequest {
        entry_id,
        check_out_time: when.to_string(),
        reason: "forgot to scan out".to_string(),
    }
}

#[test]
fn test_force_check_out_sets_hours_and_audit() {
    let mut pool = seeded_pool();
    let id = checked_in(&mut pool, "s1", MORNING, 9, 0);

    let res = ReconcileLogic::default()
        .force_check_out(&mut pool, &force(id, "2026-03-02 11:20"), "admin")
        .expect("force");
    assert!(res.success);
    assert_eq!(res.student_name, "Ada Lovelace");
    assert_eq!(res.hours_worked, 2.5);

    let entry = get_entry(&pool.conn, id).expect("query").expect("entry");
    assert_eq!(entry.check_out_time, Some(at(11, 20)));
    assert_eq!(entry.forced_checkout_reason.as_deref(), Some("forgot to scan out"));

    let log = ReconcileLogic::default()
        .change_log(&mut pool, id)
        .expect("change log");
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].change_type, ChangeType::ForceCheckout);
    assert_eq!(log[0].actor, "admin");
}

#[test]
fn test_force_check_out_of_closed_entry_reports_already_checked_out() {
    let mut pool = seeded_pool();
    let id = checked_in(&mut pool, "s2", MORNING, 9, 0);
    let logic = ReconcileLogic::default();

    logic
        .force_check_out(&mut pool, &force(id, "2026-03-02 12:00"), "admin")
        .expect("first");
    let res = logic
        .force_check_out(&mut pool, &force(id, "2026-03-02 13:00"), "admin")
        .expect("closed entry is a business outcome");
    assert!(!res.success);
    assert!(res.already_checked_out);
    assert_eq!(res.error.as_deref(), Some("Already checked out"));
    assert_eq!(res.student_name, "Grace Hopper");

    let entry = get_entry(&pool.conn, id).expect("query").expect("entry");
    assert_eq!(entry.check_out_time, Some(at(12, 0)));
    assert_eq!(entry.hours_worked, Some(3.0));
    assert_eq!(logic.change_log(&mut pool, id).expect("log").len(), 1);
}

#[test]
fn test_force_check_out_unknown_entry() {
    let mut pool = seeded_pool();
    let err = ReconcileLogic::default()
        .force_check_out(&mut pool, &force(999, "2026-03-02 12:00"), "admin")
        .expect_err("unknown entry");
    assert!(matches!(err, AppError::EntryNotFound(999)));
}

#[test]
fn test_force_check_out_requires_actor_and_reason() {
    let mut pool = seeded_pool();
    let id = checked_in(&mut pool, "s1", MORNING, 9, 0);
    let logic = ReconcileLogic::default();

    let err = logic
        .force_check_out(&mut pool, &force(id, "2026-03-02 12:00"), "")
        .expect_err("anonymous");
    assert!(matches!(err, AppError::Unauthenticated));

    let mut req = force(id, "2026-03-02 12:00");
    req.reason.clear();
    let err = logic
        .force_check_out(&mut pool, &req, "admin")
        .expect_err("no reason");
    assert!(matches!(err, AppError::MissingFields(_)));

    let err = logic
        .force_check_out(&mut pool, &force(id, "noon"), "admin")
        .expect_err("bad time");
    assert!(matches!(err, AppError::InvalidTime(_)));

    let entry = get_entry(&pool.conn, id).expect("query").expect("entry");
    assert!(entry.is_open());
}

#[test]
fn test_force_all_closes_at_each_activity_end() {
    let mut pool = seeded_pool();
    let morning = checked_in(&mut pool, "s1", MORNING, 9, 0);
    let afternoon = checked_in(&mut pool, "s2", AFTERNOON, 13, 0);

    let res = ReconcileLogic::default()
        .force_all_check_out(
            &mut pool,
            &ForceAllRequest {
                event_id: EVENT.to_string(),
                date: "2026-03-02".to_string(),
                reason: "end of day".to_string(),
            },
            "admin",
        )
        .expect("force all");
    assert!(res.success);
    assert_eq!(res.checked_out_count, 2);

    let m = get_entry(&pool.conn, morning).expect("query").expect("entry");
    assert_eq!(m.check_out_time, Some(at(12, 0)));
    assert_eq!(m.hours_worked, Some(3.0));

    let a = get_entry(&pool.conn, afternoon).expect("query").expect("entry");
    assert_eq!(a.check_out_time, Some(at(15, 0)));
    assert_eq!(a.hours_worked, Some(2.0));
}

#[test]
fn test_force_all_with_nothing_open() {
    let mut pool = seeded_pool();
    let res = ReconcileLogic::default()
        .force_all_check_out(
            &mut pool,
            &ForceAllRequest {
                event_id: EVENT.to_string(),
                date: "2026-03-02".to_string(),
                reason: "end of day".to_string(),
            },
            "admin",
        )
        .expect("force all");
    assert_eq!(res.checked_out_count, 0);
}

#[test]
fn test_force_all_without_reason_uses_default() {
    let mut pool = seeded_pool();
    let id = checked_in(&mut pool, "s1", MORNING, 9, 0);
    let logic = ReconcileLogic::default();

    let res = logic
        .force_all_check_out(
            &mut pool,
            &ForceAllRequest {
                event_id: EVENT.to_string(),
                date: "2026-03-02".to_string(),
                reason: String::new(),
            },
            "admin",
        )
        .expect("reason is optional");
    assert_eq!(res.checked_out_count, 1);

    let entry = get_entry(&pool.conn, id).expect("query").expect("entry");
    assert_eq!(entry.forced_checkout_reason.as_deref(), Some("end of day"));
    let log = logic.change_log(&mut pool, id).expect("log");
    assert_eq!(log[0].reason, "end of day");
}

#[test]
fn test_force_all_still_requires_event_and_date() {
    let mut pool = seeded_pool();
    let err = ReconcileLogic::default()
        .force_all_check_out(
            &mut pool,
            &ForceAllRequest {
                event_id: EVENT.to_string(),
                date: " ".to_string(),
                reason: String::new(),
            },
            "admin",
        )
        .expect_err("missing date");
    assert!(matches!(err, AppError::MissingFields(ref f) if f == "date"));
}

#[test]
fn test_daily_summary_counts() {
    let mut pool = seeded_pool();
    let logic = ReconcileLogic::default();

    // early arrival, stays open
    checked_in(&mut pool, "s1", MORNING, 8, 0);
    // forced closed
    let forced = checked_in(&mut pool, "s2", MORNING, 9, 0);
    logic
        .force_check_out(&mut pool, &force(forced, "2026-03-02 12:00"), "admin")
        .expect("force");
    // plain scan out
    checked_in(&mut pool, "s3", AFTERNOON, 13, 0);
    AttendanceService::default()
        .check_out_at(
            &mut pool,
            &rattendance::models::attendance::CheckOutRequest {
                student_id: "s3".to_string(),
                event_id: EVENT.to_string(),
                scanned_by: "op-1".to_string(),
            },
            at(15, 0),
        )
        .expect("check-out");

    let summary = logic
        .daily_review_summary(
            &mut pool,
            &SummaryRequest {
                event_id: EVENT.to_string(),
                date: "2026-03-02".to_string(),
            },
        )
        .expect("summary");

    assert_eq!(summary.total, 3);
    assert_eq!(summary.flagged, 1);
    assert_eq!(summary.no_checkout, 1);
    assert_eq!(summary.modified, 1);

    let other_day = logic
        .daily_review_summary(
            &mut pool,
            &SummaryRequest {
                event_id: EVENT.to_string(),
                date: "2026-03-03".to_string(),
            },
        )
        .expect("summary");
    assert_eq!(other_day.total, 0);
}

#[test]
fn test_daily_summary_unknown_event() {
    let mut pool = seeded_pool();
    let err = ReconcileLogic::default()
        .daily_review_summary(
            &mut pool,
            &SummaryRequest {
                event_id: "nope".to_string(),
                date: "2026-03-02".to_string(),
            },
        )
        .expect_err("unknown event");
    assert!(matches!(err, AppError::EventNotFound(_)));
}

#[test]
fn test_edit_entry_recomputes_hours_and_flags() {
    let mut pool = seeded_pool();
    let logic = ReconcileLogic::default();
    let id = checked_in(&mut pool, "s1", MORNING, 8, 0);

    let edited = logic
        .edit_entry(
            &mut pool,
            &EditEntryRequest {
                entry_id: id,
                check_in_time: Some("2026-03-02 09:00".to_string()),
                check_out_time: Some("2026-03-02 12:10".to_string()),
                reason: "badge misread".to_string(),
            },
            "admin",
        )
        .expect("edit");

    assert_eq!(edited.hours_worked, Some(3.0));
    assert!(!edited.flags.contains(&EntryFlag::EarlyArrival));
    assert_eq!(edited.review_status, ReviewStatus::Normal);
    assert_eq!(edited.modification_reason.as_deref(), Some("badge misread"));

    let stored = get_entry(&pool.conn, id).expect("query").expect("entry");
    assert_eq!(stored.check_in_time, at(9, 0));
    assert_eq!(stored.check_out_time, Some(at(12, 10)));

    let log = logic.change_log(&mut pool, id).expect("change log");
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].change_type, ChangeType::ManualEdit);
    assert_eq!(log[0].reason, "badge misread");
}

#[test]
fn test_edit_entry_needs_a_time() {
    let mut pool = seeded_pool();
    let id = checked_in(&mut pool, "s1", MORNING, 9, 0);
    let err = ReconcileLogic::default()
        .edit_entry(
            &mut pool,
            &EditEntryRequest {
                entry_id: id,
                check_in_time: None,
                check_out_time: None,
                reason: "nothing".to_string(),
            },
            "admin",
        )
        .expect_err("no times");
    assert!(matches!(err, AppError::MissingFields(_)));
}

#[test]
fn test_list_daily_entries() {
    let mut pool = seeded_pool();
    checked_in(&mut pool, "s1", MORNING, 9, 0);
    checked_in(&mut pool, "s2", AFTERNOON, 13, 0);

    let entries = ReconcileLogic::default()
        .list_daily_entries(&mut pool, EVENT, &common::day())
        .expect("entries");
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.event_id == EVENT));
}
