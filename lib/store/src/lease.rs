//! Cross-replica mutual exclusion via time-bounded leases.
//!
//! Every replica runs an identical poll loop; the lease turns "many
//! replicas each polling" into "exactly one logical poller at a time".
//! Acquisition is a conditional write against a single row/key per task
//! name: acquire only if unheld or expired. Expiry is the safety net
//! against a crashed holder; explicit release is an optimization only.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Result of a lease acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// This holder now owns the lease until the TTL elapses.
    Acquired,
    /// Another holder owns an unexpired lease. Expected steady state
    /// across replicas, not an error.
    AlreadyHeld,
}

/// Result of a lease renewal attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewOutcome {
    /// The TTL was extended.
    Renewed,
    /// The lease expired or was taken over; the holder must stop.
    Lost,
}

/// Errors from the lease backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseError {
    /// The backing store could not be reached.
    Backend { reason: String },
}

impl fmt::Display for LeaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend { reason } => write!(f, "lease backend failed: {reason}"),
        }
    }
}

impl std::error::Error for LeaseError {}

/// Coordination contract for exclusive, renewable, time-bounded leases.
#[async_trait]
pub trait LeaseManager: Send + Sync {
    /// Attempts to acquire the lease for `task_name`.
    ///
    /// Succeeds when the lease is unheld, expired, or already owned by
    /// this `holder_id` (re-acquisition extends the TTL).
    async fn try_acquire(
        &self,
        task_name: &str,
        holder_id: &str,
        ttl: Duration,
    ) -> Result<AcquireOutcome, LeaseError>;

    /// Extends the TTL of a lease this holder owns.
    async fn renew(
        &self,
        task_name: &str,
        holder_id: &str,
        ttl: Duration,
    ) -> Result<RenewOutcome, LeaseError>;

    /// Releases the lease early so another replica can proceed sooner.
    ///
    /// Best-effort: correctness relies on expiry, so callers log and
    /// ignore failures.
    async fn release(&self, task_name: &str, holder_id: &str) -> Result<(), LeaseError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lease_error_display() {
        let err = LeaseError::Backend {
            reason: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("connection refused"));
    }
}
