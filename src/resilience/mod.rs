//! Resilience helpers.
//!
//! The publish path deliberately has no retry. Backoff is only used by
//! the connector reconciler, which owns its own retry schedule.

pub mod backoff;

pub use backoff::{calculate_backoff, Backoff};
