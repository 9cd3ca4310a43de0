//! Error types for workflow engine calls.

use std::fmt;

/// Errors from a single dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The engine answered and refused the start call.
    Rejected { status: u16, message: String },
    /// The call never completed; whether a run started is unknown.
    Transport { reason: String },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { status, message } => {
                write!(f, "workflow engine rejected start (HTTP {status}): {message}")
            }
            Self::Transport { reason } => {
                write!(f, "workflow engine unreachable: {reason}")
            }
        }
    }
}

impl std::error::Error for DispatchError {}

/// Errors from the active-run count query.
///
/// Always transient from the gate's point of view: the caller fails closed
/// and re-checks next cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// The count could not be obtained.
    Transient { reason: String },
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient { reason } => {
                write!(f, "active-run count unavailable: {reason}")
            }
        }
    }
}

impl std::error::Error for OracleError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_error_display() {
        let err = DispatchError::Rejected {
            status: 409,
            message: "workflow def not found".to_string(),
        };
        assert!(err.to_string().contains("409"));

        let err = DispatchError::Transport {
            reason: "timeout".to_string(),
        };
        assert!(err.to_string().contains("unreachable"));
    }

    #[test]
    fn oracle_error_display() {
        let err = OracleError::Transient {
            reason: "503".to_string(),
        };
        assert!(err.to_string().contains("unavailable"));
    }
}
