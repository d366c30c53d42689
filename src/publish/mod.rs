//! Publish subsystem.
//!
//! # Data Flow
//! ```text
//! EventEnvelope
//!     → gateway.rs (serialize, send, wait for placement)
//!     → broker.rs (MessageBroker trait)
//!         → kafka.rs (rdkafka FutureProducer)
//!         → memory.rs (in-process log)
//!     → PublishResult { partition, offset } | PublishError
//! ```
//!
//! # Design Decisions
//! - One broker handle per process, shared by all requests
//! - No client-side retry; failures surface immediately
//! - Wait policy is configurable: unbounded or bounded by a timeout

pub mod broker;
pub mod gateway;
pub mod kafka;
pub mod memory;

use std::sync::Arc;

use crate::config::{BrokerConfig, BrokerDriver};

pub use broker::{BrokerError, CloseFuture, MessageBroker, PublishResult};
pub use gateway::{PublishError, PublishGateway};
pub use kafka::KafkaBroker;
pub use memory::{Behavior, MemoryBroker};

/// Open the configured broker and wrap it in a gateway.
///
/// Called once at startup; an error here should stop the process.
pub async fn connect(config: &BrokerConfig) -> Result<PublishGateway, BrokerError> {
    let broker: Arc<dyn MessageBroker> = match config.driver {
        BrokerDriver::Kafka => Arc::new(KafkaBroker::connect(config).await?),
        BrokerDriver::Memory => {
            tracing::warn!("Using in-memory broker; events are not durable");
            Arc::new(MemoryBroker::new(config.memory_partitions))
        }
    };
    Ok(PublishGateway::new(broker, config.publish_timeout()))
}
