//! Pure cron next-occurrence evaluation.
//!
//! This crate provides:
//!
//! - **`CronExpression`**: A validated cron expression
//! - **Next-occurrence computation**: strictly-after semantics, UTC only
//!
//! Evaluation is deterministic and performs no I/O. All computation is done
//! in UTC; callers normalize timezones before invocation.

pub mod error;
pub mod expression;

pub use error::CronError;
pub use expression::CronExpression;
