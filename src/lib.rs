//! Event relay library.

// Request path
pub mod correlation;
pub mod event;
pub mod http;
pub mod publish;

// Control plane
pub mod connector;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
