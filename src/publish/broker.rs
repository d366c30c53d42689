//! Broker abstraction used by the publish gateway.

use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Placement confirmation: where the broker durably stored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PublishResult {
    pub partition: i32,
    pub offset: i64,
}

/// Errors reported by a broker implementation.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Could not create the client or reach the cluster.
    #[error("broker connection failed: {0}")]
    Connection(String),

    /// The broker rejected or failed to acknowledge a message.
    #[error("broker rejected message: {0}")]
    Rejected(String),

    /// The broker handle was already closed.
    #[error("broker handle is closed")]
    Closed,

    #[error("flush incomplete: {0}")]
    Flush(String),
}

/// Boxed future returned by [`MessageBroker::send`].
pub type SendFuture<'a> =
    Pin<Box<dyn Future<Output = Result<PublishResult, BrokerError>> + Send + 'a>>;

/// Boxed future returned by [`MessageBroker::close`].
pub type CloseFuture<'a> = Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send + 'a>>;

/// A durable log accepting messages and acknowledging their placement.
///
/// One handle is shared by all requests, so implementations must be safe
/// for concurrent use.
pub trait MessageBroker: Send + Sync {
    /// Send one message with no key and wait for its placement.
    fn send<'a>(&'a self, topic: &'a str, payload: Vec<u8>) -> SendFuture<'a>;

    /// Flush queued messages and release the connection.
    fn close(&self) -> CloseFuture<'_>;

    /// Implementation name, for diagnostics.
    fn name(&self) -> &'static str;
}
