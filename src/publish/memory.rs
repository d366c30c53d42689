//! In-process broker.
//!
//! Behaves like a single-node log: messages without a key are spread
//! round-robin across partitions, offsets grow monotonically per partition.
//! Used for local development (`broker.driver = "memory"`) and tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::publish::broker::{BrokerError, CloseFuture, MessageBroker, PublishResult, SendFuture};

/// A message accepted by the memory broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub payload: Vec<u8>,
}

/// How the memory broker answers sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Acknowledge immediately.
    Available,
    /// Fail every send as if the cluster were down.
    Unreachable,
    /// Acknowledge after the given delay.
    Slow(Duration),
}

#[derive(Default)]
struct Log {
    next_offsets: Vec<i64>,
    cursor: usize,
    messages: Vec<StoredMessage>,
}

pub struct MemoryBroker {
    log: Mutex<Log>,
    behavior: Mutex<Behavior>,
    closed: AtomicBool,
}

impl MemoryBroker {
    pub fn new(partitions: u32) -> Self {
        Self {
            log: Mutex::new(Log {
                next_offsets: vec![0; partitions.max(1) as usize],
                ..Log::default()
            }),
            behavior: Mutex::new(Behavior::Available),
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_behavior(self, behavior: Behavior) -> Self {
        self.set_behavior(behavior);
        self
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        if let Ok(mut current) = self.behavior.lock() {
            *current = behavior;
        }
    }

    /// Messages stored for `topic`, in acceptance order.
    pub fn messages(&self, topic: &str) -> Vec<StoredMessage> {
        self.log
            .lock()
            .map(|log| {
                log.messages
                    .iter()
                    .filter(|m| m.topic == topic)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Total messages across all topics.
    pub fn len(&self) -> usize {
        self.log.lock().map(|log| log.messages.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn behavior(&self) -> Behavior {
        self.behavior
            .lock()
            .map(|b| *b)
            .unwrap_or(Behavior::Unreachable)
    }

    fn append(&self, topic: &str, payload: Vec<u8>) -> Result<PublishResult, BrokerError> {
        let mut log = self
            .log
            .lock()
            .map_err(|_| BrokerError::Rejected("log poisoned".to_string()))?;

        let partition = log.cursor % log.next_offsets.len();
        log.cursor = log.cursor.wrapping_add(1);
        let offset = log.next_offsets[partition];
        log.next_offsets[partition] += 1;

        let placement = PublishResult {
            partition: partition as i32,
            offset,
        };
        log.messages.push(StoredMessage {
            topic: topic.to_string(),
            partition: placement.partition,
            offset,
            payload,
        });
        Ok(placement)
    }
}

impl MessageBroker for MemoryBroker {
    fn send<'a>(&'a self, topic: &'a str, payload: Vec<u8>) -> SendFuture<'a> {
        Box::pin(async move {
            if self.is_closed() {
                return Err(BrokerError::Closed);
            }
            match self.behavior() {
                Behavior::Available => {}
                Behavior::Unreachable => {
                    return Err(BrokerError::Rejected(
                        "Local: All broker connections are down".to_string(),
                    ))
                }
                Behavior::Slow(delay) => tokio::time::sleep(delay).await,
            }
            self.append(topic, payload)
        })
    }

    fn close(&self) -> CloseFuture<'_> {
        self.closed.store(true, Ordering::Release);
        Box::pin(async { Ok(()) })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
