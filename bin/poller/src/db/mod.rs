//! Postgres implementations of the store and lease contracts.
//!
//! Domain types keep string-encoded IDs in the database; row structs
//! decode them back with `FromRow` + `try_into_*` conversions.

pub mod lease;
pub mod schedule;

pub use lease::PostgresLeaseManager;
pub use schedule::PostgresScheduleStore;
