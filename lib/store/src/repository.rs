//! The schedule store contract.
//!
//! This trait is the engine's only mutation surface. The management API may
//! create, pause, and delete schedules directly against the same backing
//! store; the engine itself only selects due rows, advances them, and
//! appends history.

use crate::error::StoreError;
use crate::history::ExecutionRecord;
use crate::schedule::Schedule;
use async_trait::async_trait;
use chime_core::ScheduleId;
use chrono::{DateTime, Utc};

/// Storage contract for schedules and their execution history.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Inserts a new schedule.
    async fn create(&self, schedule: &Schedule) -> Result<(), StoreError>;

    /// Lists schedules in creation order, paginated.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Schedule>, StoreError>;

    /// Returns active schedules with `next_run <= now`, ordered by
    /// `next_run` ascending with ties broken by ID, paginated by
    /// `limit`/`offset` to bound memory on large backlogs.
    async fn find_due(
        &self,
        now: DateTime<Utc>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Schedule>, StoreError>;

    /// Atomically advances a recurring schedule to its next occurrence.
    ///
    /// The write is conditioned on `next_run` still matching
    /// `expected_next_run`, so a lagging former lease holder cannot
    /// double-advance a row that was already processed.
    ///
    /// # Errors
    ///
    /// `NotFound` if the schedule was deleted concurrently; `Conflict` if
    /// the optimistic check failed.
    async fn advance_recurring(
        &self,
        id: ScheduleId,
        expected_next_run: DateTime<Utc>,
        new_next_run: DateTime<Utc>,
        triggered_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Atomically disables a one-shot schedule after its dispatch attempt.
    ///
    /// Same optimistic-check semantics as [`advance_recurring`].
    ///
    /// [`advance_recurring`]: ScheduleStore::advance_recurring
    async fn complete_one_shot(
        &self,
        id: ScheduleId,
        expected_next_run: DateTime<Utc>,
        triggered_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Appends an execution history record. Insert-only.
    async fn append_history(&self, record: &ExecutionRecord) -> Result<(), StoreError>;
}
