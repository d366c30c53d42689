//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! .env.dev (non-release mode only)
//!     → process environment
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, overlay environment)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup and never reloaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BrokerConfig, BrokerDriver, ConnectorConfig, IngestConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, PublishTimeout, RecordSinkKind, ServiceConfig,
};
