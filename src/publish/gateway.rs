//! Synchronous publish-and-confirm.
//!
//! The caller suspends until the broker reports a placement or an error.
//! There is no retry here; a failed publish surfaces immediately with its
//! cause and retry policy belongs to whoever calls the relay.

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::PublishTimeout;
use crate::observability::metrics;
use crate::publish::broker::{BrokerError, MessageBroker, PublishResult};

/// Why a publish did not produce a placement.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The message could not be serialized. A programming defect, since
    /// the envelope shape is controlled by the relay.
    #[error("failed to encode message for '{topic}': {source}")]
    Encoding {
        topic: String,
        #[source]
        source: serde_json::Error,
    },

    /// The broker rejected the message or could not be reached.
    #[error("publish to '{topic}' failed: {source}")]
    Broker {
        topic: String,
        #[source]
        source: BrokerError,
    },

    /// A bounded wait elapsed before the broker answered.
    #[error("publish to '{topic}' not acknowledged within {}ms", .after.as_millis())]
    TimedOut { topic: String, after: Duration },

    /// The task driving the publish ended without a result.
    #[error("publish to '{topic}' aborted: {reason}")]
    Aborted { topic: String, reason: String },
}

impl PublishError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PublishError::Encoding { .. } => "encoding_failure",
            PublishError::Broker { .. } => "publish_failure",
            PublishError::TimedOut { .. } => "publish_timeout",
            PublishError::Aborted { .. } => "publish_aborted",
        }
    }

    pub fn is_encoding(&self) -> bool {
        matches!(self, PublishError::Encoding { .. })
    }
}

/// Adapter from serializable messages to broker placements.
///
/// Cheap to clone; clones share the one broker handle opened at startup.
#[derive(Clone)]
pub struct PublishGateway {
    broker: Arc<dyn MessageBroker>,
    timeout: PublishTimeout,
}

impl PublishGateway {
    pub fn new(broker: Arc<dyn MessageBroker>, timeout: PublishTimeout) -> Self {
        Self { broker, timeout }
    }

    pub fn broker_name(&self) -> &'static str {
        self.broker.name()
    }

    /// Serialize `message` and wait for the broker to place it on `topic`.
    pub async fn publish<T>(&self, topic: &str, message: &T) -> Result<PublishResult, PublishError>
    where
        T: Serialize + ?Sized,
    {
        let payload = serde_json::to_vec(message).map_err(|source| PublishError::Encoding {
            topic: topic.to_string(),
            source,
        })?;

        let start = Instant::now();
        let send = self.broker.send(topic, payload);
        let result = match self.timeout {
            PublishTimeout::Unbounded => send.await.map_err(|source| PublishError::Broker {
                topic: topic.to_string(),
                source,
            }),
            PublishTimeout::Bounded(after) => match tokio::time::timeout(after, send).await {
                Ok(sent) => sent.map_err(|source| PublishError::Broker {
                    topic: topic.to_string(),
                    source,
                }),
                Err(_) => Err(PublishError::TimedOut {
                    topic: topic.to_string(),
                    after,
                }),
            },
        };

        match &result {
            Ok(placement) => {
                metrics::record_publish(topic, "ok", start);
                tracing::debug!(
                    topic = %topic,
                    partition = placement.partition,
                    offset = placement.offset,
                    "Message placed"
                );
            }
            Err(e) => {
                metrics::record_publish(topic, e.kind(), start);
                tracing::warn!(topic = %topic, error = %e, "Publish failed");
            }
        }
        result
    }

    /// Publish from a detached task so that dropping the caller (for
    /// example a client hanging up or a request timeout) never cancels an
    /// in-flight write.
    ///
    /// `on_complete` runs inside the task once the broker answered, so it
    /// observes every outcome even when nobody awaits the returned future.
    pub async fn publish_detached<T, F>(
        &self,
        topic: String,
        message: T,
        on_complete: F,
    ) -> Result<PublishResult, PublishError>
    where
        T: Serialize + Send + Sync + 'static,
        F: FnOnce(&T, &Result<PublishResult, PublishError>) + Send + 'static,
    {
        let gateway = self.clone();
        let task_topic = topic.clone();
        let task = tokio::spawn(async move {
            let result = gateway.publish(&task_topic, &message).await;
            on_complete(&message, &result);
            result
        });
        match task.await {
            Ok(result) => result,
            Err(join_error) => Err(PublishError::Aborted {
                topic,
                reason: join_error.to_string(),
            }),
        }
    }

    /// Flush and release the broker handle. Called once at shutdown.
    pub async fn close(&self) -> Result<(), BrokerError> {
        tracing::info!(broker = self.broker.name(), "Closing broker handle");
        self.broker.close().await
    }
}
