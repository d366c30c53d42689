//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the event relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address, limits).
    pub listener: ListenerConfig,

    /// Message broker connection and publish policy.
    pub broker: BrokerConfig,

    /// Ingest route settings (target topic, assigned event names).
    pub ingest: IngestConfig,

    /// Connector management (control plane) settings.
    pub connector: ConnectorConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Startup/shutdown settings.
    pub lifecycle: LifecycleConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,

    /// Whole-request timeout enforced by the HTTP stack, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 1024 * 1024,
            request_timeout_secs: 30,
        }
    }
}

/// Which broker implementation backs the publish gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BrokerDriver {
    /// Kafka-compatible cluster via librdkafka.
    #[default]
    Kafka,
    /// In-process log, for local development.
    Memory,
}

/// Broker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub driver: BrokerDriver,

    /// Bootstrap broker addresses.
    pub brokers: Vec<String>,

    /// Producer acknowledgment mode ("0", "1", "all").
    pub acks: String,

    /// Upper bound on waiting for a placement acknowledgment.
    /// Absent or zero means wait until the broker answers.
    pub publish_timeout_ms: Option<u64>,

    /// Timeout for the startup metadata probe.
    pub connect_timeout_ms: u64,

    /// Time allowed to flush queued messages at shutdown.
    pub flush_timeout_ms: u64,

    /// Partition count used by the memory driver.
    pub memory_partitions: u32,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            driver: BrokerDriver::Kafka,
            brokers: vec!["localhost:9092".to_string()],
            acks: "all".to_string(),
            publish_timeout_ms: None,
            connect_timeout_ms: 5_000,
            flush_timeout_ms: 5_000,
            memory_partitions: 1,
        }
    }
}

impl BrokerConfig {
    /// Publish wait policy derived from `publish_timeout_ms`.
    pub fn publish_timeout(&self) -> PublishTimeout {
        match self.publish_timeout_ms {
            Some(ms) if ms > 0 => PublishTimeout::Bounded(Duration::from_millis(ms)),
            _ => PublishTimeout::Unbounded,
        }
    }

    /// Comma-joined broker list, as librdkafka expects it.
    pub fn bootstrap_servers(&self) -> String {
        self.brokers.join(",")
    }
}

/// How long a publish call may wait for the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishTimeout {
    /// Wait until the broker acknowledges or errors.
    Unbounded,
    /// Give up after the given duration.
    Bounded(Duration),
}

/// Ingest route configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Topic every accepted event is published to.
    pub topic: String,

    /// `header.eventName` assigned to ingested events.
    pub event_name: String,

    /// `header.type` assigned to ingested events.
    pub event_type: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            topic: "example-topic".to_string(),
            event_name: "user-action".to_string(),
            event_type: "event".to_string(),
        }
    }
}

/// Connector management configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Connectors collection URL of the connector REST API.
    pub endpoint: String,

    /// Name of the sink connector to keep configured.
    pub name: String,

    /// Connector implementation class.
    pub connector_class: String,

    /// Where the sink writes to.
    pub connection_url: String,

    /// Topics the sink consumes. Empty means the ingest topic.
    pub topics: Vec<String>,

    /// Per-call timeout for control plane requests in seconds.
    pub request_timeout_secs: u64,

    /// Period of the background reconcile pass. Zero runs it once at startup.
    pub reconcile_interval_secs: u64,

    /// Attempts per reconcile pass before giving up until the next one.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8083/connectors".to_string(),
            name: "elasticsearch-sink".to_string(),
            connector_class: "io.confluent.connect.elasticsearch.ElasticsearchSinkConnector"
                .to_string(),
            connection_url: "http://elastic:9200".to_string(),
            topics: Vec::new(),
            request_timeout_secs: 15,
            reconcile_interval_secs: 300,
            max_attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
        }
    }
}

/// Output format of process diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Destination of per-request log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordSinkKind {
    /// JSON lines on stdout.
    #[default]
    Stdout,
    /// Forwarded into the tracing subscriber.
    Tracing,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Format of process diagnostics on stderr.
    pub log_format: LogFormat,

    /// Where request records are written.
    pub record_sink: RecordSinkKind,

    /// Records queued for the stdout writer before new ones are dropped.
    pub record_buffer: usize,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            record_sink: RecordSinkKind::Stdout,
            record_buffer: 8192,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// How long in-flight requests may drain after a shutdown signal.
    pub shutdown_grace_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_secs: 10,
        }
    }
}
