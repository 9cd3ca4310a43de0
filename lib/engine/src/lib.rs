//! The chime scheduling engine.
//!
//! This crate provides:
//!
//! - **[`ScheduleExecutor`]**: the per-cycle control loop (lease, due-selection,
//!   concurrency gate, dispatch, state advance, history)
//! - **[`EngineConfig`]**: tuning knobs with no externally observable protocol
//!
//! The executor is generic over the store, lease, oracle, and dispatcher
//! contracts so it can be exercised against in-memory fakes without a
//! database or a workflow engine.

pub mod config;
pub mod executor;

pub use config::{CatchUpPolicy, EngineConfig};
pub use executor::{CycleError, CycleOutcome, CycleReport, POLLER_TASK_NAME, ScheduleExecutor};
