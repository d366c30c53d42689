//! Destinations for structured log records.
//!
//! Writing is fire-and-forget for the caller: a sink never blocks a request
//! on durability and never reports failure back into the request path.
//! The stdout sink holds a bounded queue; when the writer falls behind,
//! new records are dropped and counted instead of growing memory.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::observability::metrics;
use crate::observability::records::{Level, LogRecord};

/// Append-only, concurrency-safe record writer.
pub trait LogSink: Send + Sync {
    /// Hand a record to the sink. Must not block and must not fail.
    fn write(&self, record: LogRecord);
}

enum SinkMessage {
    Record(LogRecord),
    Flush(oneshot::Sender<()>),
}

/// Writes one JSON object per line from a background task.
pub struct JsonLinesSink {
    tx: mpsc::Sender<SinkMessage>,
    dropped: AtomicU64,
}

impl JsonLinesSink {
    /// Start the writer task with room for `capacity` queued records.
    /// Must be called inside a Tokio runtime.
    pub fn spawn<W>(writer: W, capacity: usize) -> (Self, JoinHandle<()>)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(write_lines(writer, rx));
        let sink = Self {
            tx,
            dropped: AtomicU64::new(0),
        };
        (sink, handle)
    }

    /// JSON lines on stdout.
    pub fn stdout(capacity: usize) -> (Self, JoinHandle<()>) {
        Self::spawn(tokio::io::stdout(), capacity)
    }

    /// Records shed because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Wait until everything queued so far reached the writer.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(SinkMessage::Flush(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }
}

impl LogSink for JsonLinesSink {
    fn write(&self, record: LogRecord) {
        match self.tx.try_send(SinkMessage::Record(record)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                metrics::record_dropped();
            }
            // Writer task is gone; nothing left to do with the record.
            Err(mpsc::error::TrySendError::Closed(_)) => metrics::record_sink_error(),
        }
    }
}

async fn write_lines<W>(writer: W, mut rx: mpsc::Receiver<SinkMessage>)
where
    W: AsyncWrite + Unpin,
{
    let mut writer = tokio::io::BufWriter::new(writer);
    while let Some(message) = rx.recv().await {
        match message {
            SinkMessage::Record(record) => {
                let mut line = match serde_json::to_vec(&record.to_json()) {
                    Ok(line) => line,
                    Err(_) => {
                        metrics::record_sink_error();
                        continue;
                    }
                };
                line.push(b'\n');
                if writer.write_all(&line).await.is_err() {
                    metrics::record_sink_error();
                }
                // Keep latency low when the channel is idle.
                if rx.is_empty() && writer.flush().await.is_err() {
                    metrics::record_sink_error();
                }
            }
            SinkMessage::Flush(ack) => {
                if writer.flush().await.is_err() {
                    metrics::record_sink_error();
                }
                let _ = ack.send(());
            }
        }
    }
    let _ = writer.flush().await;
}

/// Forwards records into the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, record: LogRecord) {
        let json = record.to_json();
        match record.level {
            Level::Info => {
                tracing::info!(target: "event_relay::record", event = %record.event, record = %json)
            }
            Level::Error => {
                tracing::error!(target: "event_relay::record", event = %record.event, record = %json)
            }
        }
    }
}

/// Keeps records in memory. Used by tests and local tooling.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Records carrying the given request id.
    pub fn for_request(&self, request_id: &str) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.get_str("request_id") == Some(request_id))
            .collect()
    }

    /// Records with the given event name.
    pub fn events(&self, event: &str) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.event == event)
            .collect()
    }
}

impl LogSink for MemorySink {
    fn write(&self, record: LogRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}
