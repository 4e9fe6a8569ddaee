//! QR payload codec: `"<subjectId>|<eventId>|<checksum>"`.
//!
//! The checksum is a corruption/typo guard, not tamper-proofing: a 32-bit
//! polynomial rolling hash over `"subjectId|eventId"`, rendered as 8 hex
//! digits.

use crate::errors::{AppError, AppResult};
use serde::Serialize;
use std::fmt;

pub const SEPARATOR: char = '|';
const SEGMENTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanPayload {
    pub subject_id: String,
    pub event_id: String,
    pub checksum: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadError {
    /// The payload did not split into exactly three segments
    SegmentCount(usize),
    EmptySegment,
    ChecksumMismatch { expected: String, found: String },
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadError::SegmentCount(n) => {
                write!(f, "invalid QR code: expected {} segments, found {}", SEGMENTS, n)
            }
            PayloadError::EmptySegment => write!(f, "invalid QR code: empty segment"),
            PayloadError::ChecksumMismatch { .. } => {
                write!(f, "invalid QR code: checksum mismatch")
            }
        }
    }
}

/// Outcome of [`decode`]; never an `Err`, invalid input is reported inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedPayload {
    pub subject_id: String,
    pub event_id: String,
    pub checksum: String,
    pub is_valid: bool,
    pub error: Option<PayloadError>,
}

impl DecodedPayload {
    fn invalid(error: PayloadError) -> Self {
        Self {
            subject_id: String::new(),
            event_id: String::new(),
            checksum: String::new(),
            is_valid: false,
            error: Some(error),
        }
    }

    /// The validated payload, if any.
    pub fn into_payload(self) -> Option<ScanPayload> {
        if self.is_valid {
            Some(ScanPayload {
                subject_id: self.subject_id,
                event_id: self.event_id,
                checksum: self.checksum,
            })
        } else {
            None
        }
    }
}

pub fn checksum(subject_id: &str, event_id: &str) -> String {
    let mut h: u32 = 0;
    for b in subject_id
        .bytes()
        .chain(std::iter::once(SEPARATOR as u8))
        .chain(event_id.bytes())
    {
        h = h.wrapping_mul(31).wrapping_add(b as u32);
    }
    format!("{:08x}", h)
}

fn validate_field(name: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidPayload(format!("{} is empty", name)));
    }
    // decode trims, so padded ids would not survive a round trip
    if value != value.trim() {
        return Err(AppError::InvalidPayload(format!(
            "{} has leading or trailing whitespace",
            name
        )));
    }
    if value.contains(SEPARATOR) {
        return Err(AppError::InvalidPayload(format!(
            "{} must not contain '{}'",
            name, SEPARATOR
        )));
    }
    Ok(())
}

pub fn encode(subject_id: &str, event_id: &str) -> AppResult<String> {
    validate_field("subjectId", subject_id)?;
    validate_field("eventId", event_id)?;

    Ok(format!(
        "{subject_id}{SEPARATOR}{event_id}{SEPARATOR}{}",
        checksum(subject_id, event_id)
    ))
}

pub fn decode(payload: &str) -> DecodedPayload {
    let parts: Vec<&str> = payload.trim().split(SEPARATOR).collect();
    if parts.len() != SEGMENTS {
        return DecodedPayload::invalid(PayloadError::SegmentCount(parts.len()));
    }

    let (subject_id, event_id, found) = (parts[0], parts[1], parts[2]);
    if subject_id.is_empty() || event_id.is_empty() || found.is_empty() {
        return DecodedPayload::invalid(PayloadError::EmptySegment);
    }

    let expected = checksum(subject_id, event_id);
    let is_valid = expected.eq_ignore_ascii_case(found);

    DecodedPayload {
        subject_id: subject_id.to_string(),
        event_id: event_id.to_string(),
        checksum: found.to_string(),
        is_valid,
        error: (!is_valid).then(|| PayloadError::ChecksumMismatch {
            expected,
            found: found.to_string(),
        }),
    }
}
