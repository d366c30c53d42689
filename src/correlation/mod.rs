//! Request correlation subsystem.
//!
//! # Data Flow
//! ```text
//! inbound headers (x-request-id, x-parent-id, x-session-id, UA, client hints)
//!     → context.rs (typed extraction with per-field defaults)
//!     → fingerprint.rs (client/host signals, best effort)
//!     → CorrelationContext
//!     → bound into the request logger, echoed as x-request-id
//! ```
//!
//! # Design Decisions
//! - Derivation never fails; malformed headers count as absent
//! - Span ids are minted per context and never inherited
//! - The context is passed explicitly, never looked up from a side channel

pub mod context;
pub mod fingerprint;

pub use context::{CorrelationContext, X_PARENT_ID, X_REQUEST_ID, X_SESSION_ID};
pub use fingerprint::{ClientFingerprint, HostIdentity};
