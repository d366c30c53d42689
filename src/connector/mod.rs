//! Control plane integration.
//!
//! # Data Flow
//! ```text
//! GET /topics  → client.rs list()
//! GET /topic   → client.rs ensure()
//! startup + every interval → reconcile.rs → client.rs ensure()
//! ```
//!
//! # Design Decisions
//! - Ensuring the sink connector is a scheduled concern, not part of the
//!   ingest hot path
//! - Failures map to 5xx only on the routes that call the control plane

pub mod client;
pub mod reconcile;

pub use client::{Connector, ConnectorClient, ConnectorError, EnsureOutcome};
pub use reconcile::ConnectorReconciler;
