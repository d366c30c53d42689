//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, layers)
//!     → middleware.rs (correlation context, bound logger, access record)
//!     → handlers.rs (route dispatch)
//!         → pipeline.rs (ingest: envelope, publish, result record)
//!         → connector client (topics / topic)
//!     → response.rs (success body or {statusCode, error, message})
//! ```

pub mod handlers;
pub mod middleware;
pub mod pipeline;
pub mod response;
pub mod server;

pub use pipeline::{IngestOutcome, RequestPipeline, Stage};
pub use response::ApiError;
pub use server::{AppState, HttpServer, ServerError};
