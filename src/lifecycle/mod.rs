//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → server stops accepting, drains (bounded)
//!             → reconciler stops
//!             → main closes the broker, drains the record sink
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
