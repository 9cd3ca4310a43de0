//! Immutable execution history records.

use chime_core::{ExecutionRecordId, ScheduleId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a single dispatch attempt or skip decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// The workflow engine accepted the trigger.
    Success,
    /// The dispatch attempt failed; the schedule stays due.
    Failed,
    /// The concurrency gate rejected the attempt; nothing was mutated.
    Skipped,
}

/// An audit entry for one dispatch attempt.
///
/// Records are insert-only and outlive their schedule: `schedule_id` is an
/// owning reference, not ownership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Unique identifier.
    pub id: ExecutionRecordId,
    /// The schedule this attempt belongs to.
    pub schedule_id: ScheduleId,
    /// When the attempt was made.
    pub attempted_at: DateTime<Utc>,
    /// What happened.
    pub outcome: ExecutionOutcome,
    /// Response payload, error text, or skip reason.
    pub detail: Option<String>,
    /// When this record was created.
    pub created_at: DateTime<Utc>,
}

impl ExecutionRecord {
    fn new(
        schedule_id: ScheduleId,
        attempted_at: DateTime<Utc>,
        outcome: ExecutionOutcome,
        detail: Option<String>,
    ) -> Self {
        Self {
            id: ExecutionRecordId::new(),
            schedule_id,
            attempted_at,
            outcome,
            detail,
            created_at: Utc::now(),
        }
    }

    /// Builds a record for a successful dispatch.
    #[must_use]
    pub fn success(
        schedule_id: ScheduleId,
        attempted_at: DateTime<Utc>,
        detail: impl Into<String>,
    ) -> Self {
        Self::new(
            schedule_id,
            attempted_at,
            ExecutionOutcome::Success,
            Some(detail.into()),
        )
    }

    /// Builds a record for a failed dispatch attempt.
    #[must_use]
    pub fn failed(
        schedule_id: ScheduleId,
        attempted_at: DateTime<Utc>,
        error: impl Into<String>,
    ) -> Self {
        Self::new(
            schedule_id,
            attempted_at,
            ExecutionOutcome::Failed,
            Some(error.into()),
        )
    }

    /// Builds a record for a concurrency-gate rejection.
    #[must_use]
    pub fn skipped(
        schedule_id: ScheduleId,
        attempted_at: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(
            schedule_id,
            attempted_at,
            ExecutionOutcome::Skipped,
            Some(reason.into()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_constructors_set_outcome() {
        let schedule_id = ScheduleId::new();
        let now = Utc::now();

        let ok = ExecutionRecord::success(schedule_id, now, "run_abc");
        assert_eq!(ok.outcome, ExecutionOutcome::Success);
        assert_eq!(ok.detail.as_deref(), Some("run_abc"));

        let failed = ExecutionRecord::failed(schedule_id, now, "engine rejected");
        assert_eq!(failed.outcome, ExecutionOutcome::Failed);

        let skipped = ExecutionRecord::skipped(schedule_id, now, "ceiling reached");
        assert_eq!(skipped.outcome, ExecutionOutcome::Skipped);
        assert_eq!(skipped.schedule_id, schedule_id);
    }

    #[test]
    fn record_serde_roundtrip() {
        let record = ExecutionRecord::failed(ScheduleId::new(), Utc::now(), "boom");
        let json = serde_json::to_string(&record).expect("serialize");
        let parsed: ExecutionRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(record, parsed);
    }
}
