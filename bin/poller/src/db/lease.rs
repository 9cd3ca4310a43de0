//! Postgres-backed lease manager.
//!
//! One row per task name. Acquisition is a single conditional upsert:
//! the insert wins an empty table, and the conflict-update only fires
//! when the existing lease is expired or already ours. Two replicas
//! racing the same row serialize on the row lock, so exactly one sees
//! its write land.
//!
//! `held_until` is computed in SQL so that expiry and extension are both
//! judged by the database clock; replica clock skew never shortens or
//! stretches a lease.

use async_trait::async_trait;
use chime_store::{AcquireOutcome, LeaseError, LeaseManager, RenewOutcome};
use sqlx::PgPool;
use std::time::Duration;

fn backend_error(e: sqlx::Error) -> LeaseError {
    LeaseError::Backend {
        reason: e.to_string(),
    }
}

/// Postgres implementation of [`LeaseManager`].
pub struct PostgresLeaseManager {
    pool: PgPool,
}

impl PostgresLeaseManager {
    /// Creates a new lease manager on the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeaseManager for PostgresLeaseManager {
    async fn try_acquire(
        &self,
        task_name: &str,
        holder_id: &str,
        ttl: Duration,
    ) -> Result<AcquireOutcome, LeaseError> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            INSERT INTO scheduler_leases (task_name, holder_id, held_until)
            VALUES ($1, $2, now() + make_interval(secs => $3))
            ON CONFLICT (task_name) DO UPDATE
                SET holder_id = EXCLUDED.holder_id, held_until = EXCLUDED.held_until
                WHERE scheduler_leases.held_until <= now()
                   OR scheduler_leases.holder_id = EXCLUDED.holder_id
            RETURNING task_name
            "#,
        )
        .bind(task_name)
        .bind(holder_id)
        .bind(ttl.as_secs_f64())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_error)?;

        Ok(if row.is_some() {
            AcquireOutcome::Acquired
        } else {
            AcquireOutcome::AlreadyHeld
        })
    }

    async fn renew(
        &self,
        task_name: &str,
        holder_id: &str,
        ttl: Duration,
    ) -> Result<RenewOutcome, LeaseError> {
        let result = sqlx::query(
            r#"
            UPDATE scheduler_leases
            SET held_until = now() + make_interval(secs => $3)
            WHERE task_name = $1 AND holder_id = $2 AND held_until > now()
            "#,
        )
        .bind(task_name)
        .bind(holder_id)
        .bind(ttl.as_secs_f64())
        .execute(&self.pool)
        .await
        .map_err(backend_error)?;

        Ok(if result.rows_affected() == 1 {
            RenewOutcome::Renewed
        } else {
            RenewOutcome::Lost
        })
    }

    async fn release(&self, task_name: &str, holder_id: &str) -> Result<(), LeaseError> {
        sqlx::query("DELETE FROM scheduler_leases WHERE task_name = $1 AND holder_id = $2")
            .bind(task_name)
            .bind(holder_id)
            .execute(&self.pool)
            .await
            .map_err(backend_error)?;
        Ok(())
    }
}
