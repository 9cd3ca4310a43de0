//! The poll-cycle executor.
//!
//! Each cycle: acquire the poller lease, page through due schedules in
//! `next_run` order, and for each one apply the concurrency gate, dispatch
//! the trigger, advance the schedule, and append history. Per-schedule
//! errors are contained within that schedule's step; only lease failure or
//! a store-wide outage aborts a cycle.
//!
//! Across replicas the lease serializes cycles: at most one replica is
//! inside the per-schedule loop at any instant. Within a replica the loop
//! is sequential, so oldest-due work is processed first under backlog.

use crate::config::{CatchUpPolicy, EngineConfig};
use chime_conductor::{ConcurrencyOracle, StartWorkflowRequest, TriggerDispatcher};
use chime_cron::CronExpression;
use chime_store::{
    AcquireOutcome, ExecutionRecord, LeaseError, LeaseManager, Schedule, ScheduleKind,
    ScheduleStore, StoreError,
};
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::time::Instant;

/// Logical task name shared by every replica's poller.
pub const POLLER_TASK_NAME: &str = "schedule-poller";

/// Counters for one completed cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Due schedules examined.
    pub examined: u32,
    /// Triggers dispatched and advanced.
    pub dispatched: u32,
    /// Concurrency-gate rejections.
    pub skipped: u32,
    /// Dispatch or advance failures.
    pub failed: u32,
    /// Schedules deferred because the gate could not be verified.
    pub deferred: u32,
    /// Whether the cycle stopped before exhausting the due set (page cap
    /// or wall-clock budget).
    pub truncated: bool,
}

/// Result of one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another replica holds the lease; nothing was done.
    NotAcquired,
    /// This replica ran the cycle.
    Ran(CycleReport),
}

/// Errors that abort a whole cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleError {
    /// The due-selection query failed; the store is unreachable.
    Store(StoreError),
    /// The lease backend failed.
    Lease(LeaseError),
}

impl std::fmt::Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(e) => write!(f, "store error: {e}"),
            Self::Lease(e) => write!(f, "lease error: {e}"),
        }
    }
}

impl std::error::Error for CycleError {}

impl From<StoreError> for CycleError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<LeaseError> for CycleError {
    fn from(e: LeaseError) -> Self {
        Self::Lease(e)
    }
}

/// The scheduling engine's control loop, one instance per replica.
pub struct ScheduleExecutor<S, L, O, D> {
    store: S,
    lease: L,
    oracle: O,
    dispatcher: D,
    config: EngineConfig,
    holder_id: String,
}

impl<S, L, O, D> ScheduleExecutor<S, L, O, D>
where
    S: ScheduleStore,
    L: LeaseManager,
    O: ConcurrencyOracle,
    D: TriggerDispatcher,
{
    /// Creates an executor identified by `holder_id` in the lease table.
    pub fn new(
        store: S,
        lease: L,
        oracle: O,
        dispatcher: D,
        config: EngineConfig,
        holder_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            lease,
            oracle,
            dispatcher,
            config,
            holder_id: holder_id.into(),
        }
    }

    /// Runs one poll cycle at the current instant.
    ///
    /// # Errors
    ///
    /// Returns an error only for cycle-aborting failures: the lease backend
    /// or the due-selection query. Per-schedule failures are recorded in
    /// history and counted in the report instead.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, CycleError> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Runs one poll cycle with an explicit reference instant.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<CycleOutcome, CycleError> {
        let acquired = self
            .lease
            .try_acquire(POLLER_TASK_NAME, &self.holder_id, self.config.lease_ttl())
            .await?;
        if acquired == AcquireOutcome::AlreadyHeld {
            tracing::debug!(task = POLLER_TASK_NAME, "lease held by another replica");
            return Ok(CycleOutcome::NotAcquired);
        }

        // The budget is measured monotonically from acquisition, so `now`
        // may be any reference instant (a replayed or backfilled cycle)
        // without eating into it.
        let started = Instant::now();
        let report = self.process_due_schedules(now, started).await?;

        // Correctness relies on expiry; release just shortens the window
        // before another replica can proceed.
        if let Err(e) = self.lease.release(POLLER_TASK_NAME, &self.holder_id).await {
            tracing::debug!(error = %e, "best-effort lease release failed");
        }

        tracing::info!(
            examined = report.examined,
            dispatched = report.dispatched,
            skipped = report.skipped,
            failed = report.failed,
            deferred = report.deferred,
            truncated = report.truncated,
            "poll cycle finished"
        );
        Ok(CycleOutcome::Ran(report))
    }

    /// Pages through the due set and processes each schedule in order.
    async fn process_due_schedules(
        &self,
        now: DateTime<Utc>,
        started: Instant,
    ) -> Result<CycleReport, CycleError> {
        let mut report = CycleReport::default();
        let budget = self.config.cycle_budget();
        let page_size = i64::from(self.config.page_size);
        let mut offset = 0i64;
        let mut pages = 0u32;

        'paging: loop {
            let page = self.store.find_due(now, page_size, offset).await?;
            let page_len = page.len();

            for schedule in page {
                if started.elapsed() >= budget {
                    tracing::warn!(
                        holder = %self.holder_id,
                        "cycle budget exhausted before lease TTL; stopping early"
                    );
                    report.truncated = true;
                    break 'paging;
                }
                report.examined += 1;
                self.process_schedule(&schedule, now, &mut report).await;
            }

            pages += 1;
            if (page_len as i64) < page_size {
                break;
            }
            if pages >= self.config.max_pages_per_cycle {
                report.truncated = true;
                break;
            }
            offset += page_size;
        }

        Ok(report)
    }

    /// Processes a single due schedule. All errors are contained here.
    async fn process_schedule(
        &self,
        schedule: &Schedule,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) {
        // Concurrency gate: fail closed when the count cannot be verified.
        let active = match self
            .oracle
            .count_active_runs(&schedule.namespace, &schedule.workflow_name)
            .await
        {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(
                    schedule_id = %schedule.id,
                    workflow = %schedule.workflow_name,
                    error = %e,
                    "cannot verify active-run count; deferring to next cycle"
                );
                report.deferred += 1;
                return;
            }
        };

        let ceiling = u32::try_from(schedule.max_concurrent_runs).unwrap_or(1);
        if active >= ceiling {
            tracing::info!(
                schedule_id = %schedule.id,
                workflow = %schedule.workflow_name,
                active,
                ceiling,
                "concurrency ceiling reached; skipping"
            );
            let record = ExecutionRecord::skipped(
                schedule.id,
                now,
                format!("{active} active runs at ceiling {ceiling}"),
            );
            self.append_history(record).await;
            report.skipped += 1;
            return;
        }

        let request = StartWorkflowRequest {
            name: schedule.workflow_name.clone(),
            version: schedule.workflow_version,
            input: trigger_input(schedule),
        };

        match self.dispatcher.start_workflow(request).await {
            Ok(handle) => {
                self.finalize_dispatch(schedule, now, &handle.run_id, report)
                    .await;
            }
            Err(e) => {
                // Leave next_run/status untouched: the schedule stays due
                // and is retried on the next cycle.
                tracing::warn!(
                    schedule_id = %schedule.id,
                    workflow = %schedule.workflow_name,
                    error = %e,
                    "dispatch failed; schedule remains due"
                );
                self.append_history(ExecutionRecord::failed(schedule.id, now, e.to_string()))
                    .await;
                report.failed += 1;
            }
        }
    }

    /// Advances the schedule after a successful dispatch and records the
    /// outcome.
    async fn finalize_dispatch(
        &self,
        schedule: &Schedule,
        now: DateTime<Utc>,
        run_id: &str,
        report: &mut CycleReport,
    ) {
        let update = match &schedule.kind {
            ScheduleKind::Recurring { cron_expression } => {
                let next_run = match self.next_occurrence(schedule, cron_expression, now) {
                    Ok(next) => next,
                    Err(detail) => {
                        self.append_history(ExecutionRecord::failed(schedule.id, now, detail))
                            .await;
                        report.failed += 1;
                        return;
                    }
                };
                self.store
                    .advance_recurring(schedule.id, schedule.next_run, next_run, now)
                    .await
            }
            ScheduleKind::OneShot { .. } => {
                self.store
                    .complete_one_shot(schedule.id, schedule.next_run, now)
                    .await
            }
        };

        match update {
            Ok(()) => {
                self.append_history(ExecutionRecord::success(schedule.id, now, run_id))
                    .await;
                report.dispatched += 1;
            }
            Err(e @ (StoreError::Conflict { .. } | StoreError::NotFound { .. })) => {
                // Someone else already advanced or deleted this row.
                tracing::debug!(schedule_id = %schedule.id, error = %e, "advance lost optimistic check");
                self.append_history(ExecutionRecord::failed(schedule.id, now, e.to_string()))
                    .await;
                report.failed += 1;
            }
            Err(e) => {
                tracing::warn!(schedule_id = %schedule.id, error = %e, "advance failed");
                self.append_history(ExecutionRecord::failed(schedule.id, now, e.to_string()))
                    .await;
                report.failed += 1;
            }
        }
    }

    /// Computes the next occurrence for a recurring schedule.
    ///
    /// Creation validates expressions, so a parse failure here means the
    /// row was corrupted or written around the validation path. It is a
    /// per-schedule error, never a cycle abort.
    fn next_occurrence(
        &self,
        schedule: &Schedule,
        cron_expression: &str,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, String> {
        let expr = CronExpression::parse(cron_expression).map_err(|e| {
            tracing::error!(
                schedule_id = %schedule.id,
                expression = cron_expression,
                error = %e,
                "stored cron expression failed to parse"
            );
            e.to_string()
        })?;

        let reference = match self.config.catch_up_policy {
            CatchUpPolicy::SkipToCurrent => now,
            CatchUpPolicy::CatchUp => schedule.next_run,
        };

        expr.next_occurrence(reference).map_err(|e| {
            tracing::error!(schedule_id = %schedule.id, error = %e, "no upcoming occurrence");
            e.to_string()
        })
    }

    /// Appends a history record, logging instead of failing the schedule:
    /// history is audit data, and the ambient retry is the next cycle.
    async fn append_history(&self, record: ExecutionRecord) {
        if let Err(e) = self.store.append_history(&record).await {
            tracing::warn!(
                schedule_id = %record.schedule_id,
                error = %e,
                "failed to append history record"
            );
        }
    }
}

/// Builds the engine input for a dispatch: the schedule's payload with the
/// originating schedule ID stamped in.
fn trigger_input(schedule: &Schedule) -> JsonValue {
    let mut input = match &schedule.payload {
        JsonValue::Object(map) => JsonValue::Object(map.clone()),
        JsonValue::Null => JsonValue::Object(serde_json::Map::new()),
        other => serde_json::json!({ "payload": other }),
    };
    if let JsonValue::Object(map) = &mut input {
        map.insert(
            "scheduledBy".to_string(),
            JsonValue::String(schedule.id.to_string()),
        );
    }
    input
}
