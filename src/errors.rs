//! Unified application error type.
//! All modules (db, core, scanner, offline, rpc, cli) return AppError to keep
//! the error handling consistent and easy to manage.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // ---------------------------
    // IO
    // ---------------------------
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // ---------------------------
    // Database-related
    // ---------------------------
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    // ---------------------------
    // Validation errors (fatal, never retried)
    // ---------------------------
    #[error("missing required fields: {0}")]
    MissingFields(String),

    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    #[error("Invalid time format: {0}")]
    InvalidTime(String),

    #[error("Invalid payload field: {0}")]
    InvalidPayload(String),

    #[error("Invalid intent kind: {0}")]
    InvalidIntentKind(String),

    #[error("unauthenticated: an actor is required for this operation")]
    Unauthenticated,

    // ---------------------------
    // Not-found errors
    // ---------------------------
    #[error("student not found: {0}")]
    StudentNotFound(String),

    #[error("event not found: {0}")]
    EventNotFound(String),

    #[error("time entry not found: {0}")]
    EntryNotFound(i64),

    // ---------------------------
    // Transient device / network errors
    // ---------------------------
    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Remote error: {0}")]
    Remote(String),

    // ---------------------------
    // Config errors
    // ---------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to save configuration")]
    ConfigSave,

    // ---------------------------
    // Generic fallback
    // ---------------------------
    #[error("Internal error: {0}")]
    Other(String),
}

impl AppError {
    /// Transient failures: the caller may retry later (camera busy, network
    /// down, storage locked). Everything else signals bad input or data.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Io(_) | AppError::Camera(_) | AppError::Transport(_)
        ) || matches!(
            self,
            AppError::Db(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ErrorCode::DatabaseLocked
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::StudentNotFound(_) | AppError::EventNotFound(_) | AppError::EntryNotFound(_)
        )
    }

    /// Stable name of the error class, carried in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Io(_) => "io",
            AppError::Db(_) => "db",
            AppError::MissingFields(_) => "missing_fields",
            AppError::InvalidDate(_) => "invalid_date",
            AppError::InvalidTime(_) => "invalid_time",
            AppError::InvalidPayload(_) => "invalid_payload",
            AppError::InvalidIntentKind(_) => "invalid_intent_kind",
            AppError::Unauthenticated => "unauthenticated",
            AppError::StudentNotFound(_) => "student_not_found",
            AppError::EventNotFound(_) => "event_not_found",
            AppError::EntryNotFound(_) => "entry_not_found",
            AppError::Camera(_) => "camera",
            AppError::Transport(_) => "transport",
            AppError::Remote(_) => "remote",
            AppError::Config(_) | AppError::ConfigSave => "config",
            AppError::Other(_) => "other",
        }
    }

    /// The variant's own argument, without the display prefix.
    pub fn detail(&self) -> String {
        match self {
            AppError::MissingFields(s)
            | AppError::InvalidDate(s)
            | AppError::InvalidTime(s)
            | AppError::InvalidPayload(s)
            | AppError::InvalidIntentKind(s)
            | AppError::StudentNotFound(s)
            | AppError::EventNotFound(s) => s.clone(),
            AppError::EntryNotFound(id) => id.to_string(),
            other => other.to_string(),
        }
    }

    /// Rebuild a client-side error from `code()` and `detail()`.
    /// Only validation, auth and not-found classes cross the wire intact.
    pub fn from_code(code: &str, detail: String) -> Option<AppError> {
        let err = match code {
            "missing_fields" => AppError::MissingFields(detail),
            "invalid_date" => AppError::InvalidDate(detail),
            "invalid_time" => AppError::InvalidTime(detail),
            "invalid_payload" => AppError::InvalidPayload(detail),
            "invalid_intent_kind" => AppError::InvalidIntentKind(detail),
            "unauthenticated" => AppError::Unauthenticated,
            "student_not_found" => AppError::StudentNotFound(detail),
            "event_not_found" => AppError::EventNotFound(detail),
            "entry_not_found" => AppError::EntryNotFound(detail.parse().ok()?),
            _ => return None,
        };
        Some(err)
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::MissingFields(_)
                | AppError::InvalidDate(_)
                | AppError::InvalidTime(_)
                | AppError::InvalidPayload(_)
                | AppError::InvalidIntentKind(_)
        )
    }
}

pub type AppResult<T> = Result<T, AppError>;
