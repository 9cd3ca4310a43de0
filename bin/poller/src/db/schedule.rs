//! Postgres-backed schedule store.

use async_trait::async_trait;
use chime_core::ScheduleId;
use chime_store::{
    ExecutionOutcome, ExecutionRecord, Schedule, ScheduleKind, ScheduleStatus, ScheduleStore,
    StoreError,
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

fn status_as_str(status: ScheduleStatus) -> &'static str {
    match status {
        ScheduleStatus::Active => "active",
        ScheduleStatus::Paused => "paused",
        ScheduleStatus::Disabled => "disabled",
    }
}

fn status_from_str(s: &str) -> ScheduleStatus {
    match s {
        "active" => ScheduleStatus::Active,
        "disabled" => ScheduleStatus::Disabled,
        // Unknown statuses must never fire.
        _ => ScheduleStatus::Paused,
    }
}

fn outcome_as_str(outcome: ExecutionOutcome) -> &'static str {
    match outcome {
        ExecutionOutcome::Success => "success",
        ExecutionOutcome::Failed => "failed",
        ExecutionOutcome::Skipped => "skipped",
    }
}

/// Row type for schedule queries.
#[derive(FromRow)]
struct ScheduleRow {
    id: String,
    namespace: String,
    name: String,
    workflow_name: String,
    workflow_version: i32,
    schedule_kind: String,
    cron_expression: Option<String>,
    run_at: Option<DateTime<Utc>>,
    next_run: DateTime<Utc>,
    max_concurrent_runs: i32,
    last_triggered_at: Option<DateTime<Utc>>,
    status: String,
    payload: serde_json::Value,
    created_by: String,
    created_at: DateTime<Utc>,
}

fn decode_error(message: String) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message,
    )))
}

impl ScheduleRow {
    fn try_into_schedule(self) -> Result<Schedule, sqlx::Error> {
        let id = ScheduleId::from_str(&self.id)
            .map_err(|e| decode_error(format!("invalid schedule id '{}': {}", self.id, e)))?;

        let kind = match self.schedule_kind.as_str() {
            "recurring" => ScheduleKind::Recurring {
                cron_expression: self.cron_expression.ok_or_else(|| {
                    decode_error(format!("recurring schedule {id} has no cron_expression"))
                })?,
            },
            "one_shot" => ScheduleKind::OneShot {
                run_at: self
                    .run_at
                    .ok_or_else(|| decode_error(format!("one-shot schedule {id} has no run_at")))?,
            },
            other => {
                return Err(decode_error(format!(
                    "unknown schedule_kind '{other}' for {id}"
                )));
            }
        };

        Ok(Schedule {
            id,
            namespace: self.namespace,
            name: self.name,
            workflow_name: self.workflow_name,
            workflow_version: self.workflow_version,
            kind,
            next_run: self.next_run,
            max_concurrent_runs: self.max_concurrent_runs,
            last_triggered_at: self.last_triggered_at,
            status: status_from_str(&self.status),
            payload: self.payload,
            created_by: self.created_by,
            created_at: self.created_at,
        })
    }
}

const SCHEDULE_COLUMNS: &str = "id, namespace, name, workflow_name, workflow_version, \
     schedule_kind, cron_expression, run_at, next_run, max_concurrent_runs, \
     last_triggered_at, status, payload, created_by, created_at";

fn unavailable(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable {
        reason: e.to_string(),
    }
}

/// Postgres implementation of [`ScheduleStore`].
pub struct PostgresScheduleStore {
    pool: PgPool,
}

impl PostgresScheduleStore {
    /// Creates a new store on the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Probes for row existence to tell Conflict apart from NotFound after
    /// a conditional update touched zero rows.
    async fn exists(&self, id: ScheduleId) -> Result<bool, StoreError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM workflow_schedules WHERE id = $1)")
                .bind(id.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(unavailable)?;
        Ok(exists)
    }

    async fn classify_zero_rows(&self, id: ScheduleId) -> StoreError {
        match self.exists(id).await {
            Ok(true) => StoreError::Conflict { id },
            Ok(false) => StoreError::NotFound { id },
            Err(e) => e,
        }
    }
}

#[async_trait]
impl ScheduleStore for PostgresScheduleStore {
    async fn create(&self, schedule: &Schedule) -> Result<(), StoreError> {
        let (kind, cron_expression, run_at) = match &schedule.kind {
            ScheduleKind::Recurring { cron_expression } => {
                ("recurring", Some(cron_expression.clone()), None)
            }
            ScheduleKind::OneShot { run_at } => ("one_shot", None, Some(*run_at)),
        };

        sqlx::query(
            r#"
            INSERT INTO workflow_schedules
                (id, namespace, name, workflow_name, workflow_version, schedule_kind,
                 cron_expression, run_at, next_run, max_concurrent_runs,
                 last_triggered_at, status, payload, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(schedule.id.to_string())
        .bind(&schedule.namespace)
        .bind(&schedule.name)
        .bind(&schedule.workflow_name)
        .bind(schedule.workflow_version)
        .bind(kind)
        .bind(cron_expression)
        .bind(run_at)
        .bind(schedule.next_run)
        .bind(schedule.max_concurrent_runs)
        .bind(schedule.last_triggered_at)
        .bind(status_as_str(schedule.status))
        .bind(&schedule.payload)
        .bind(&schedule.created_by)
        .bind(schedule.created_at)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Schedule>, StoreError> {
        let rows: Vec<ScheduleRow> = sqlx::query_as(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM workflow_schedules \
             ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        rows.into_iter()
            .map(|r| r.try_into_schedule().map_err(unavailable))
            .collect()
    }

    async fn find_due(
        &self,
        now: DateTime<Utc>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Schedule>, StoreError> {
        let rows: Vec<ScheduleRow> = sqlx::query_as(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM workflow_schedules \
             WHERE status = 'active' AND next_run <= $1 \
             ORDER BY next_run ASC, id ASC LIMIT $2 OFFSET $3"
        ))
        .bind(now)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        rows.into_iter()
            .map(|r| r.try_into_schedule().map_err(unavailable))
            .collect()
    }

    async fn advance_recurring(
        &self,
        id: ScheduleId,
        expected_next_run: DateTime<Utc>,
        new_next_run: DateTime<Utc>,
        triggered_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE workflow_schedules
            SET next_run = $3, last_triggered_at = $4
            WHERE id = $1 AND next_run = $2 AND status = 'active'
            "#,
        )
        .bind(id.to_string())
        .bind(expected_next_run)
        .bind(new_next_run)
        .bind(triggered_at)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        if result.rows_affected() == 0 {
            return Err(self.classify_zero_rows(id).await);
        }
        Ok(())
    }

    async fn complete_one_shot(
        &self,
        id: ScheduleId,
        expected_next_run: DateTime<Utc>,
        triggered_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE workflow_schedules
            SET status = 'disabled', last_triggered_at = $3
            WHERE id = $1 AND next_run = $2 AND status = 'active'
            "#,
        )
        .bind(id.to_string())
        .bind(expected_next_run)
        .bind(triggered_at)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        if result.rows_affected() == 0 {
            return Err(self.classify_zero_rows(id).await);
        }
        Ok(())
    }

    async fn append_history(&self, record: &ExecutionRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO schedule_history
                (id, schedule_id, attempted_at, outcome, detail, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.schedule_id.to_string())
        .bind(record.attempted_at)
        .bind(outcome_as_str(record.outcome))
        .bind(&record.detail)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        for status in [
            ScheduleStatus::Active,
            ScheduleStatus::Paused,
            ScheduleStatus::Disabled,
        ] {
            assert_eq!(status_from_str(status_as_str(status)), status);
        }
    }

    #[test]
    fn unknown_status_never_fires() {
        assert_eq!(status_from_str("archived"), ScheduleStatus::Paused);
    }

    #[test]
    fn row_decodes_recurring_schedule() {
        let id = ScheduleId::new();
        let now = Utc::now();
        let row = ScheduleRow {
            id: id.to_string(),
            namespace: "billing".to_string(),
            name: "billing:invoice-sync".to_string(),
            workflow_name: "invoice-sync".to_string(),
            workflow_version: 1,
            schedule_kind: "recurring".to_string(),
            cron_expression: Some("0 9 * * *".to_string()),
            run_at: None,
            next_run: now,
            max_concurrent_runs: 1,
            last_triggered_at: None,
            status: "active".to_string(),
            payload: serde_json::Value::Null,
            created_by: "system".to_string(),
            created_at: now,
        };

        let schedule = row.try_into_schedule().expect("should decode");
        assert_eq!(schedule.id, id);
        assert_eq!(
            schedule.kind,
            ScheduleKind::Recurring {
                cron_expression: "0 9 * * *".to_string()
            }
        );
        assert_eq!(schedule.status, ScheduleStatus::Active);
    }

    #[test]
    fn recurring_row_without_expression_fails_decode() {
        let now = Utc::now();
        let row = ScheduleRow {
            id: ScheduleId::new().to_string(),
            namespace: "billing".to_string(),
            name: "billing:invoice-sync".to_string(),
            workflow_name: "invoice-sync".to_string(),
            workflow_version: 1,
            schedule_kind: "recurring".to_string(),
            cron_expression: None,
            run_at: None,
            next_run: now,
            max_concurrent_runs: 1,
            last_triggered_at: None,
            status: "active".to_string(),
            payload: serde_json::Value::Null,
            created_by: "system".to_string(),
            created_at: now,
        };

        assert!(row.try_into_schedule().is_err());
    }

    #[test]
    fn outcomes_map_to_distinct_columns() {
        let values: Vec<&str> = [
            ExecutionOutcome::Success,
            ExecutionOutcome::Failed,
            ExecutionOutcome::Skipped,
        ]
        .into_iter()
        .map(outcome_as_str)
        .collect();
        assert_eq!(values, vec!["success", "failed", "skipped"]);
    }
}
