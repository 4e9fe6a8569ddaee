use rattendance::errors::AppError;
use rattendance::scanner::payload::{PayloadError, checksum, decode, encode};

#[test]
fn test_encode_then_decode_is_valid() {
    let payload = encode("s-1024", "food-drive").expect("encode");
    assert_eq!(payload.split('|').count(), 3);

    let decoded = decode(&payload);
    assert!(decoded.is_valid);
    assert!(decoded.error.is_none());
    assert_eq!(decoded.subject_id, "s-1024");
    assert_eq!(decoded.event_id, "food-drive");

    let p = decoded.into_payload().expect("valid payload");
    assert_eq!(p.checksum, checksum("s-1024", "food-drive"));
}

#[test]
fn test_checksum_is_deterministic_hex() {
    let a = checksum("s1", "e1");
    assert_eq!(a, checksum("s1", "e1"));
    assert_eq!(a.len(), 8);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert_ne!(a, checksum("s2", "e1"));
}

#[test]
fn test_tampered_subject_is_rejected() {
    let payload = encode("s1", "e1").expect("encode");
    let sum = payload.rsplit('|').next().expect("checksum segment");
    let tampered = format!("s2|e1|{}", sum);

    let decoded = decode(&tampered);
    assert!(!decoded.is_valid);
    assert!(matches!(
        decoded.error,
        Some(PayloadError::ChecksumMismatch { .. })
    ));
    assert!(decoded.into_payload().is_none());
}

#[test]
fn test_wrong_segment_count_fails_closed() {
    for bad in ["", "s1", "s1|e1", "s1|e1|abc|extra"] {
        let decoded = decode(bad);
        assert!(!decoded.is_valid, "accepted {:?}", bad);
        assert!(matches!(decoded.error, Some(PayloadError::SegmentCount(_))));
    }
}

#[test]
fn test_empty_segment_is_distinct_error() {
    let decoded = decode("|e1|00000000");
    assert_eq!(decoded.error, Some(PayloadError::EmptySegment));
}

#[test]
fn test_checksum_comparison_ignores_case_and_whitespace() {
    let upper = format!("  s1|e1|{}\n", checksum("s1", "e1").to_uppercase());
    let decoded = decode(&upper);
    assert!(decoded.is_valid);
    assert_eq!(decoded.subject_id, "s1");
}

#[test]
fn test_encode_rejects_bad_fields() {
    assert!(matches!(encode("", "e1"), Err(AppError::InvalidPayload(_))));
    assert!(matches!(encode("s|1", "e1"), Err(AppError::InvalidPayload(_))));
    assert!(matches!(encode("s1", "   "), Err(AppError::InvalidPayload(_))));
}

#[test]
fn test_encode_rejects_padded_ids() {
    for (subject, event) in [(" s1", "e1"), ("s1 ", "e1"), ("s1", "\te1"), ("s1", "e1 ")] {
        let err = encode(subject, event).expect_err("padded id");
        assert!(
            matches!(err, AppError::InvalidPayload(ref m) if m.contains("whitespace")),
            "{:?} / {:?}: {}",
            subject,
            event,
            err
        );
    }

    // inner spaces survive the trip
    let payload = encode("s 1", "food drive").expect("encode");
    let decoded = decode(&payload);
    assert!(decoded.is_valid);
    assert_eq!(decoded.subject_id, "s 1");
    assert_eq!(decoded.event_id, "food drive");
}
