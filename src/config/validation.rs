//! Configuration validation.
//!
//! Serde handles the syntactic checks; this module checks value ranges and
//! addresses. Every problem is reported, not just the first.

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{BrokerDriver, ServiceConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("kafka driver requires at least one broker address")]
    NoBrokers,

    #[error("invalid producer acks '{0}', expected 0, 1 or all")]
    Acks(String),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("invalid connector endpoint '{0}'")]
    ConnectorEndpoint(String),
}

/// Check a loaded configuration, returning every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("listener.max_body_bytes"));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero("listener.request_timeout_secs"));
    }

    let broker = &config.broker;
    if broker.driver == BrokerDriver::Kafka
        && broker.brokers.iter().all(|b| b.trim().is_empty())
    {
        errors.push(ValidationError::NoBrokers);
    }
    if !matches!(broker.acks.as_str(), "0" | "1" | "all" | "-1") {
        errors.push(ValidationError::Acks(broker.acks.clone()));
    }
    if broker.driver == BrokerDriver::Memory && broker.memory_partitions == 0 {
        errors.push(ValidationError::Zero("broker.memory_partitions"));
    }

    if config.ingest.topic.trim().is_empty() {
        errors.push(ValidationError::Empty("ingest.topic"));
    }
    if config.ingest.event_name.trim().is_empty() {
        errors.push(ValidationError::Empty("ingest.event_name"));
    }

    let connector = &config.connector;
    match url::Url::parse(&connector.endpoint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => errors.push(ValidationError::ConnectorEndpoint(
            connector.endpoint.clone(),
        )),
    }
    if connector.name.trim().is_empty() {
        errors.push(ValidationError::Empty("connector.name"));
    }
    if connector.max_attempts == 0 {
        errors.push(ValidationError::Zero("connector.max_attempts"));
    }

    if config.observability.record_buffer == 0 {
        errors.push(ValidationError::Zero("observability.record_buffer"));
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
