//! Process diagnostics and record sink setup.
//!
//! Diagnostics (startup, broker, reconcile, shutdown) go through `tracing`
//! to stderr. Request records go through a [`LogSink`] so stdout carries
//! nothing but record lines.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig, RecordSinkKind};
use crate::observability::sink::{JsonLinesSink, LogSink, TracingSink};

/// Install the global tracing subscriber. `RUST_LOG` wins over config.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "event_relay={level},tower_http={level}",
            level = config.log_level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.log_format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };
    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

/// Record sink chosen by config, plus a handle to drain it at shutdown.
pub struct RecordSink {
    pub sink: Arc<dyn LogSink>,
    lines: Option<(Arc<JsonLinesSink>, JoinHandle<()>)>,
}

impl RecordSink {
    /// Build the configured sink. Must be called inside a Tokio runtime.
    pub fn from_config(config: &ObservabilityConfig) -> Self {
        match config.record_sink {
            RecordSinkKind::Stdout => {
                let (sink, handle) = JsonLinesSink::stdout(config.record_buffer);
                let sink = Arc::new(sink);
                Self {
                    sink: sink.clone(),
                    lines: Some((sink, handle)),
                }
            }
            RecordSinkKind::Tracing => Self {
                sink: Arc::new(TracingSink),
                lines: None,
            },
        }
    }

    /// Flush pending records. Called last during shutdown.
    pub async fn drain(self) {
        if let Some((sink, _handle)) = self.lines {
            sink.flush().await;
            let dropped = sink.dropped();
            if dropped > 0 {
                tracing::warn!(dropped, "Record sink shed records while the writer lagged");
            }
        }
    }
}
