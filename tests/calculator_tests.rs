use chrono::{NaiveDate, NaiveDateTime};
use rattendance::core::calculator::flags::{FlagPolicy, get_flags, is_early_arrival, is_late_stay};
use rattendance::core::calculator::hours::{calculate_hours, round_to_half_hour};
use rattendance::models::time_entry::EntryFlag;

fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 2)
        .and_then(|d| d.and_hms_opt(h, m, 0))
        .expect("valid datetime")
}

#[test]
fn test_hours_round_to_nearest_half() {
    assert_eq!(calculate_hours(at(9, 0), at(15, 13)).rounded, 6.0);
    assert_eq!(calculate_hours(at(9, 0), at(15, 16)).rounded, 6.5);
    assert_eq!(calculate_hours(at(9, 0), at(15, 47)).rounded, 7.0);
    assert_eq!(calculate_hours(at(9, 0), at(16, 30)).rounded, 7.5);
}

#[test]
fn test_hours_breakdown_fields() {
    let h = calculate_hours(at(9, 0), at(10, 30));
    assert_eq!(h.minutes, 90);
    assert!((h.raw - 1.5).abs() < f64::EPSILON);
    assert_eq!(h.rounded, 1.5);
}

#[test]
fn test_rounding_boundary_is_half_up() {
    // 15 minutes is exactly a quarter hour
    assert_eq!(round_to_half_hour(6.25), 6.5);
    assert_eq!(round_to_half_hour(6.2), 6.0);
}

#[test]
fn test_checkout_before_checkin_clamps_to_zero() {
    let h = calculate_hours(at(12, 0), at(11, 0));
    assert_eq!(h.minutes, 0);
    assert_eq!(h.rounded, 0.0);
}

#[test]
fn test_early_arrival_is_strict() {
    let start = at(9, 0);
    assert!(!is_early_arrival(at(8, 45), start));
    assert!(is_early_arrival(at(8, 44), start));
    assert!(is_early_arrival(at(8, 30), start));
    assert!(!is_early_arrival(at(9, 5), start));
}

#[test]
fn test_late_stay_is_strict() {
    let end = at(17, 0);
    assert!(!is_late_stay(at(17, 15), end));
    assert!(is_late_stay(at(17, 16), end));
}

#[test]
fn test_get_flags_skips_late_stay_without_checkout() {
    let flags = get_flags(at(8, 0), None, at(9, 0), at(10, 0));
    assert!(flags.contains(&EntryFlag::EarlyArrival));
    assert!(!flags.contains(&EntryFlag::LateStay));

    let flags = get_flags(at(9, 0), Some(at(18, 0)), at(9, 0), at(17, 0));
    assert_eq!(flags.into_iter().collect::<Vec<_>>(), vec![EntryFlag::LateStay]);
}

#[test]
fn test_custom_policy_thresholds() {
    let policy = FlagPolicy::new(30, 5);
    assert!(!policy.is_early_arrival(at(8, 40), at(9, 0)));
    assert!(policy.is_late_stay(at(17, 6), at(17, 0)));
}
