//! Schedule persistence contracts for the chime scheduler.
//!
//! This crate provides:
//!
//! - **Data model**: [`Schedule`], [`ExecutionRecord`] and their state machines
//! - **Store contract**: [`ScheduleStore`], the engine's only mutation surface
//! - **Lease contract**: [`LeaseManager`], cross-replica mutual exclusion
//!
//! Postgres implementations of the contracts live with the poller binary;
//! everything here is backend-agnostic.

pub mod error;
pub mod history;
pub mod lease;
pub mod repository;
pub mod schedule;

pub use error::{ScheduleError, StoreError};
pub use history::{ExecutionOutcome, ExecutionRecord};
pub use lease::{AcquireOutcome, LeaseError, LeaseManager, RenewOutcome};
pub use repository::ScheduleStore;
pub use schedule::{NewSchedule, Schedule, ScheduleKind, ScheduleStatus};
