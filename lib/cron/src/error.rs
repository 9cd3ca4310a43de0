//! Error types for cron evaluation.

use std::fmt;

/// Errors from cron expression parsing and evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CronError {
    /// The expression could not be parsed.
    Malformed { expression: String, reason: String },
    /// The expression parses but never fires within the evaluation horizon.
    NoUpcomingOccurrence { expression: String },
}

impl fmt::Display for CronError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { expression, reason } => {
                write!(f, "malformed cron expression '{expression}': {reason}")
            }
            Self::NoUpcomingOccurrence { expression } => {
                write!(
                    f,
                    "cron expression '{expression}' has no upcoming occurrence"
                )
            }
        }
    }
}

impl std::error::Error for CronError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_display() {
        let err = CronError::Malformed {
            expression: "bogus".to_string(),
            reason: "expected 5, 6, or 7 fields, got 1".to_string(),
        };
        assert!(err.to_string().contains("bogus"));
        assert!(err.to_string().contains("got 1"));
    }

    #[test]
    fn no_occurrence_display() {
        let err = CronError::NoUpcomingOccurrence {
            expression: "0 0 0 30 2 *".to_string(),
        };
        assert!(err.to_string().contains("no upcoming occurrence"));
    }
}
