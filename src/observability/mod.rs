//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request path:
//!     → records.rs (StructuredLogger::bind → RequestLogger)
//!     → sink.rs (JSON lines on stdout, or tracing, or memory in tests)
//!
//! Process diagnostics:
//!     → logging.rs (tracing subscriber, stderr)
//!     → metrics.rs (counters, histograms, Prometheus endpoint)
//! ```
//!
//! # Design Decisions
//! - Request records are flat JSON objects joined by `request_id`/`span_id`
//! - Sink failures are swallowed; they never reach the HTTP caller
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
pub mod records;
pub mod sink;

pub use records::{Fields, Level, LogRecord, RequestLogger, StructuredLogger};
pub use sink::{JsonLinesSink, LogSink, MemorySink, TracingSink};
