//! Error types for the civic agenda scheduling engine.

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

use crate::activity::ActivityStatus;

/// Main error type for scheduling operations.
#[derive(Error, Debug)]
pub enum AgendaError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("State transition error: {0}")]
    StateTransition(#[from] StateTransitionError),

    #[error("Conflict: {0}")]
    Conflict(#[from] ConflictError),

    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AgendaError {
    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            AgendaError::Config(_) => "config_error",
            AgendaError::Validation(_) => "validation_error",
            AgendaError::StateTransition(_) => "state_transition_error",
            AgendaError::Conflict(_) => "conflict",
            AgendaError::NotFound(_) => "not_found",
            AgendaError::Storage(_) | AgendaError::Io(_) | AgendaError::Serialization(_) => {
                "storage_error"
            }
        }
    }
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Malformed activity specs and requests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Title is {len} characters long (max {max})")]
    TitleTooLong { len: usize, max: usize },

    #[error("Start time {start} must be before end time {end}")]
    TimeOrder { start: NaiveTime, end: NaiveTime },

    #[error("Recurrence end date {end_date} precedes anchor date {date}")]
    RecurrenceEndBeforeAnchor { date: NaiveDate, end_date: NaiveDate },

    #[error("Unknown recurrence pattern")]
    UnknownPattern,

    #[error("Weekday index {0} is outside 0..=6")]
    InvalidWeekday(u8),

    #[error("Activities cannot be created with status {0}")]
    InvalidInitialStatus(ActivityStatus),

    #[error("A physical child cannot itself recur")]
    RecurringChild,

    #[error("Malformed occurrence id: {0}")]
    InvalidOccurrenceId(String),

    #[error("Unknown scope: {0} (expected 'occurrence' or 'series')")]
    InvalidScope(String),

    #[error("Unknown lifecycle action: {0}")]
    InvalidAction(String),

    #[error("Query range spans {days} days (max {max})")]
    RangeTooWide { days: i64, max: i64 },

    #[error(
        "Activity {0} is a series parent and its first date is the series itself; \
         use scope=series to change or delete it, or address a later date as '{0}@YYYY-MM-DD'"
    )]
    SeriesParentAddressed(String),

    #[error("Field '{0}' can only be changed on the whole series")]
    SeriesOnlyField(String),
}

/// An illegal lifecycle jump.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot move activity from {from} to {to}")]
pub struct StateTransitionError {
    pub from: ActivityStatus,
    pub to: ActivityStatus,
}

/// Uniqueness and concurrency violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConflictError {
    #[error("Series {parent_id} already has a physical occurrence on {date}")]
    DuplicateChild { parent_id: String, date: NaiveDate },

    #[error("Activity {id} is {actual}, expected {expected}")]
    StaleStatus {
        id: String,
        expected: ActivityStatus,
        actual: ActivityStatus,
    },

    #[error("Activity id already exists: {0}")]
    DuplicateId(String),
}

/// Unknown activities and occurrences.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("Activity not found: {0}")]
    Activity(String),

    #[error("Series {parent_id} has no occurrence on {date}")]
    Occurrence { parent_id: String, date: NaiveDate },
}

/// Persistence failures from an activity store.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt data file: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for scheduling operations.
pub type Result<T> = std::result::Result<T, AgendaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AgendaError::Config(ConfigError::MissingField("storage.data_dir".to_string()));
        assert!(err.to_string().contains("storage.data_dir"));
    }

    #[test]
    fn test_error_codes() {
        let err: AgendaError = StateTransitionError {
            from: ActivityStatus::Draft,
            to: ActivityStatus::Completed,
        }
        .into();
        assert_eq!(err.code(), "state_transition_error");
        assert!(err.to_string().contains("DRAFT"));
        assert!(err.to_string().contains("COMPLETED"));

        let err: AgendaError = NotFoundError::Activity("a-1".to_string()).into();
        assert_eq!(err.code(), "not_found");

        let err: AgendaError = ConflictError::DuplicateId("a-1".to_string()).into();
        assert_eq!(err.code(), "conflict");
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AgendaError = io_err.into();
        assert!(matches!(err, AgendaError::Io(_)));
        assert_eq!(err.code(), "storage_error");
    }
}
