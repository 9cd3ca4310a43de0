//! Error types for the store crate.
//!
//! - `ScheduleError`: creation-time validation failures
//! - `StoreError`: failures from the persistence contract

use chime_core::ScheduleId;
use std::fmt;

/// Errors from schedule creation and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The cron expression is invalid or never fires.
    InvalidCronExpression { expression: String, reason: String },
    /// A one-shot run time is not strictly in the future.
    RunAtNotInFuture { run_at: String },
    /// The concurrency ceiling must be at least 1.
    InvalidConcurrencyLimit { value: i32 },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCronExpression { expression, reason } => {
                write!(f, "invalid cron expression '{expression}': {reason}")
            }
            Self::RunAtNotInFuture { run_at } => {
                write!(f, "run_at must be in the future, got {run_at}")
            }
            Self::InvalidConcurrencyLimit { value } => {
                write!(f, "max_concurrent_runs must be at least 1, got {value}")
            }
        }
    }
}

impl std::error::Error for ScheduleError {}

/// Errors from schedule store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The schedule no longer exists.
    NotFound { id: ScheduleId },
    /// The optimistic check failed: someone else already advanced the row.
    Conflict { id: ScheduleId },
    /// The backing store is unavailable; the caller's ambient policy retries.
    Unavailable { reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { id } => write!(f, "schedule not found: {id}"),
            Self::Conflict { id } => {
                write!(f, "schedule {id} was modified concurrently")
            }
            Self::Unavailable { reason } => {
                write!(f, "schedule store unavailable: {reason}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_error_display() {
        let err = ScheduleError::InvalidCronExpression {
            expression: "bogus".to_string(),
            reason: "expected 5, 6, or 7 fields, got 1".to_string(),
        };
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn store_error_display() {
        let id = ScheduleId::new();
        let err = StoreError::Conflict { id };
        assert!(err.to_string().contains("modified concurrently"));
        assert!(err.to_string().contains(&id.to_string()));
    }
}
