//! Kafka-compatible broker via librdkafka.

use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::{BrokerConfig, PublishTimeout};
use crate::publish::broker::{BrokerError, CloseFuture, MessageBroker, PublishResult, SendFuture};

/// Producer handle shared by all requests.
pub struct KafkaBroker {
    producer: FutureProducer,
    queue_timeout: Timeout,
    flush_timeout: Duration,
    closed: AtomicBool,
}

impl KafkaBroker {
    /// Create the producer and verify the cluster answers a metadata
    /// request. Failure here is fatal for the process.
    pub async fn connect(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let brokers = config.bootstrap_servers();
        let producer = producer_config(config).create::<FutureProducer>().map_err(|e| {
            BrokerError::Connection(format!("failed to create producer: {e}"))
        })?;

        let probe = producer.clone();
        let connect_timeout = Duration::from_millis(config.connect_timeout_ms);
        let metadata = tokio::task::spawn_blocking(move || {
            probe
                .client()
                .fetch_metadata(None, connect_timeout)
                .map(|m| m.brokers().len())
        })
        .await
        .map_err(|e| BrokerError::Connection(format!("metadata probe aborted: {e}")))?
        .map_err(|e| BrokerError::Connection(format!("{brokers}: {e}")))?;

        tracing::info!(
            brokers = %brokers,
            cluster_size = metadata,
            acks = %config.acks,
            publish_timeout = ?config.publish_timeout(),
            "Kafka producer connected"
        );

        Ok(Self {
            producer,
            queue_timeout: match config.publish_timeout() {
                PublishTimeout::Bounded(d) => Timeout::After(d),
                PublishTimeout::Unbounded => Timeout::Never,
            },
            flush_timeout: Duration::from_millis(config.flush_timeout_ms),
            closed: AtomicBool::new(false),
        })
    }
}

fn producer_config(config: &BrokerConfig) -> ClientConfig {
    // librdkafka treats 0 as "no delivery timeout".
    let message_timeout_ms = match config.publish_timeout() {
        PublishTimeout::Bounded(d) => d.as_millis().to_string(),
        PublishTimeout::Unbounded => "0".to_string(),
    };

    let mut client = ClientConfig::new();
    client
        .set("bootstrap.servers", config.bootstrap_servers())
        .set("acks", &config.acks)
        .set("message.timeout.ms", message_timeout_ms);
    client
}

impl MessageBroker for KafkaBroker {
    fn send<'a>(&'a self, topic: &'a str, payload: Vec<u8>) -> SendFuture<'a> {
        Box::pin(async move {
            if self.closed.load(Ordering::Acquire) {
                return Err(BrokerError::Closed);
            }

            let record = FutureRecord::<(), [u8]>::to(topic).payload(payload.as_slice());
            match self.producer.send(record, self.queue_timeout).await {
                Ok((partition, offset)) => Ok(PublishResult { partition, offset }),
                Err((kafka_error, _message)) => Err(BrokerError::Rejected(kafka_error.to_string())),
            }
        })
    }

    fn close(&self) -> CloseFuture<'_> {
        Box::pin(async move {
            if self.closed.swap(true, Ordering::AcqRel) {
                return Ok(());
            }
            let producer = self.producer.clone();
            let flush_timeout = self.flush_timeout;
            let pending = producer.in_flight_count();

            // librdkafka's flush blocks the calling thread.
            tokio::task::spawn_blocking(move || producer.flush(flush_timeout))
                .await
                .map_err(|e| BrokerError::Flush(format!("flush task aborted: {e}")))?
                .map_err(|e| BrokerError::Flush(format!("{pending} in flight: {e}")))?;
            tracing::info!(flushed = pending, "Kafka producer closed");
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "kafka"
    }
}
