//! Schedule definitions and their state machine.

use crate::error::ScheduleError;
use chime_core::ScheduleId;
use chime_cron::CronExpression;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Whether a schedule fires repeatedly or exactly once.
///
/// A closed variant: the engine matches exhaustively on it, so adding a
/// third kind forces every dispatch site to be updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduleKind {
    /// Cron-driven recurring schedule.
    Recurring {
        /// Cron expression (e.g. "0 9 * * *" for 09:00 UTC daily).
        cron_expression: String,
    },
    /// Fires once at a fixed future instant, then is disabled.
    OneShot {
        /// The instant to fire at.
        run_at: DateTime<Utc>,
    },
}

/// Lifecycle status of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    /// Eligible for due-selection.
    Active,
    /// Temporarily excluded from due-selection; may be resumed.
    Paused,
    /// Terminal. One-shot schedules end here after their dispatch attempt.
    Disabled,
}

/// A durable trigger definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// Unique identifier.
    pub id: ScheduleId,
    /// Tenant/ownership scope.
    pub namespace: String,
    /// Display name, `namespace:workflow_name` by convention.
    pub name: String,
    /// Target workflow in the external engine.
    pub workflow_name: String,
    /// Target workflow version.
    pub workflow_version: i32,
    /// Recurring or one-shot.
    pub kind: ScheduleKind,
    /// Next instant this schedule becomes due. Always UTC, always present,
    /// monotonically non-decreasing while `Active`.
    pub next_run: DateTime<Utc>,
    /// Ceiling on simultaneously active triggered runs for
    /// (namespace, workflow_name). At least 1.
    pub max_concurrent_runs: i32,
    /// Most recent successful dispatch, if any.
    pub last_triggered_at: Option<DateTime<Utc>>,
    /// Lifecycle status.
    pub status: ScheduleStatus,
    /// Opaque input forwarded to the workflow engine.
    pub payload: JsonValue,
    /// Who created the schedule.
    pub created_by: String,
    /// When the schedule was created.
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating a schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSchedule {
    pub namespace: String,
    pub workflow_name: String,
    pub workflow_version: i32,
    pub kind: ScheduleKind,
    pub max_concurrent_runs: i32,
    pub payload: JsonValue,
    pub created_by: String,
}

impl Schedule {
    /// Validates creation parameters and builds an active schedule with its
    /// initial `next_run` computed relative to `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cron expression is malformed or never fires,
    /// if a one-shot `run_at` is not strictly in the future, or if the
    /// concurrency ceiling is below 1.
    pub fn create(spec: NewSchedule, now: DateTime<Utc>) -> Result<Self, ScheduleError> {
        if spec.max_concurrent_runs < 1 {
            return Err(ScheduleError::InvalidConcurrencyLimit {
                value: spec.max_concurrent_runs,
            });
        }

        let next_run = match &spec.kind {
            ScheduleKind::Recurring { cron_expression } => {
                let expr = CronExpression::parse(cron_expression).map_err(|e| {
                    ScheduleError::InvalidCronExpression {
                        expression: cron_expression.clone(),
                        reason: e.to_string(),
                    }
                })?;
                expr.next_occurrence(now)
                    .map_err(|e| ScheduleError::InvalidCronExpression {
                        expression: cron_expression.clone(),
                        reason: e.to_string(),
                    })?
            }
            ScheduleKind::OneShot { run_at } => {
                if *run_at <= now {
                    return Err(ScheduleError::RunAtNotInFuture {
                        run_at: run_at.to_rfc3339(),
                    });
                }
                *run_at
            }
        };

        Ok(Self {
            id: ScheduleId::new(),
            name: format!("{}:{}", spec.namespace, spec.workflow_name),
            namespace: spec.namespace,
            workflow_name: spec.workflow_name,
            workflow_version: spec.workflow_version,
            kind: spec.kind,
            next_run,
            max_concurrent_runs: spec.max_concurrent_runs,
            last_triggered_at: None,
            status: ScheduleStatus::Active,
            payload: spec.payload,
            created_by: spec.created_by,
            created_at: now,
        })
    }

    /// Checks whether this schedule is due at the given instant.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == ScheduleStatus::Active && self.next_run <= now
    }

    /// Pauses the schedule.
    pub fn pause(&mut self) {
        self.status = ScheduleStatus::Paused;
    }

    /// Resumes a paused schedule.
    pub fn resume(&mut self) {
        if self.status == ScheduleStatus::Paused {
            self.status = ScheduleStatus::Active;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
    }

    fn recurring_spec(cron: &str) -> NewSchedule {
        NewSchedule {
            namespace: "billing".to_string(),
            workflow_name: "invoice-sync".to_string(),
            workflow_version: 1,
            kind: ScheduleKind::Recurring {
                cron_expression: cron.to_string(),
            },
            max_concurrent_runs: 1,
            payload: serde_json::json!({"region": "eu"}),
            created_by: "system".to_string(),
        }
    }

    #[test]
    fn recurring_schedule_gets_initial_next_run() {
        let now = at(2025, 1, 1, 0);
        let schedule = Schedule::create(recurring_spec("0 9 * * *"), now).unwrap();

        // Next 09:00 after creation is the same day.
        assert_eq!(schedule.next_run, at(2025, 1, 1, 9));
        assert_eq!(schedule.status, ScheduleStatus::Active);
        assert_eq!(schedule.name, "billing:invoice-sync");
        assert!(schedule.last_triggered_at.is_none());
    }

    #[test]
    fn malformed_cron_is_rejected_at_creation() {
        let now = at(2025, 1, 1, 0);
        let err = Schedule::create(recurring_spec("not a cron"), now).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidCronExpression { .. }));
    }

    #[test]
    fn one_shot_requires_future_run_at() {
        let now = at(2025, 1, 1, 12);
        let mut spec = recurring_spec("0 9 * * *");
        spec.kind = ScheduleKind::OneShot {
            run_at: at(2025, 1, 1, 9),
        };
        let err = Schedule::create(spec.clone(), now).unwrap_err();
        assert!(matches!(err, ScheduleError::RunAtNotInFuture { .. }));

        spec.kind = ScheduleKind::OneShot {
            run_at: at(2025, 1, 2, 9),
        };
        let schedule = Schedule::create(spec, now).unwrap();
        assert_eq!(schedule.next_run, at(2025, 1, 2, 9));
    }

    #[test]
    fn concurrency_limit_below_one_is_rejected() {
        let now = at(2025, 1, 1, 0);
        let mut spec = recurring_spec("0 9 * * *");
        spec.max_concurrent_runs = 0;
        let err = Schedule::create(spec, now).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidConcurrencyLimit { value: 0 }
        ));
    }

    #[test]
    fn due_requires_active_status_and_elapsed_next_run() {
        let now = at(2025, 1, 1, 0);
        let mut schedule = Schedule::create(recurring_spec("0 9 * * *"), now).unwrap();

        assert!(!schedule.is_due(at(2025, 1, 1, 8)));
        assert!(schedule.is_due(at(2025, 1, 1, 9)));

        schedule.pause();
        assert!(!schedule.is_due(at(2025, 1, 1, 9)));

        schedule.resume();
        assert!(schedule.is_due(at(2025, 1, 1, 9)));
    }

    #[test]
    fn resume_does_not_reactivate_disabled() {
        let now = at(2025, 1, 1, 0);
        let mut schedule = Schedule::create(recurring_spec("0 9 * * *"), now).unwrap();
        schedule.status = ScheduleStatus::Disabled;
        schedule.resume();
        assert_eq!(schedule.status, ScheduleStatus::Disabled);
    }

    #[test]
    fn schedule_serde_roundtrip() {
        let now = at(2025, 1, 1, 0);
        let schedule = Schedule::create(recurring_spec("0 9 * * *"), now).unwrap();
        let json = serde_json::to_string(&schedule).expect("serialize");
        let parsed: Schedule = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(schedule, parsed);
    }
}
