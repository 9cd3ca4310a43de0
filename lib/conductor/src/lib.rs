//! Client for the external workflow-execution engine.
//!
//! This crate provides:
//!
//! - **[`TriggerDispatcher`]**: one-attempt workflow start with classified outcome
//! - **[`ConcurrencyOracle`]**: best-effort count of currently active runs
//! - **[`ConductorClient`]**: HTTP implementation of both contracts
//!
//! The dispatcher never retries internally: the engine is not guaranteed
//! idempotent, and a retried call could double-start a run. Retry is the
//! scheduling loop's job, via re-polling.

pub mod client;
pub mod error;

pub use client::{
    ConcurrencyOracle, ConductorClient, ConductorConfig, RunHandle, StartWorkflowRequest,
    TriggerDispatcher,
};
pub use error::{DispatchError, OracleError};
