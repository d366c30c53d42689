//! Structured per-request log records.
//!
//! # Design Decisions
//! - The base logger is built once at startup and never mutated
//! - `bind` derives a request logger carrying the correlation ids
//! - Bound fields win over caller fields, so every record of a request
//!   carries the same `(request_id, span_id)` join key
//! - Records are flat JSON objects; nested values stay structured

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;

use crate::correlation::CorrelationContext;
use crate::observability::sink::LogSink;

/// Field name → value mapping of a record.
pub type Fields = Map<String, Value>;

/// Record severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Error => "error",
        }
    }
}

/// One emitted log record.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: Level,
    pub event: String,
    pub fields: Fields,
}

impl LogRecord {
    /// Look up a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Look up a string field.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Flat JSON form: `level` and `event` followed by all fields.
    pub fn to_json(&self) -> Value {
        let mut out = Map::with_capacity(self.fields.len() + 2);
        out.insert("level".into(), Value::from(self.level.as_str()));
        out.insert("event".into(), Value::from(self.event.clone()));
        for (k, v) in &self.fields {
            out.insert(k.clone(), v.clone());
        }
        Value::Object(out)
    }
}

/// Process-wide logging facade.
///
/// Cheap to clone; all clones share the same sink and base fields.
#[derive(Clone)]
pub struct StructuredLogger {
    sink: Arc<dyn LogSink>,
    base: Arc<Fields>,
    origin: Instant,
}

impl StructuredLogger {
    /// Create the base logger with service identification fields.
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        let mut base = Fields::new();
        base.insert("service".into(), Value::from(env!("CARGO_PKG_NAME")));
        base.insert("version".into(), Value::from(env!("CARGO_PKG_VERSION")));
        Self {
            sink,
            base: Arc::new(base),
            origin: Instant::now(),
        }
    }

    /// Derive a request logger with the correlation ids attached.
    pub fn bind(&self, ctx: &CorrelationContext) -> RequestLogger {
        let mut bound = (*self.base).clone();
        bound.insert("request_id".into(), Value::from(ctx.request_id.clone()));
        bound.insert("parent_id".into(), Value::from(ctx.parent_id.clone()));
        bound.insert("span_id".into(), Value::from(ctx.span_id.clone()));
        bound.insert("session_id".into(), Value::from(ctx.session_id.clone()));

        RequestLogger {
            sink: self.sink.clone(),
            bound: Arc::new(bound),
            origin: self.origin,
        }
    }

    /// Process-level record without correlation fields.
    pub fn info(&self, event: &str, fields: Value) {
        emit(&*self.sink, &self.base, Level::Info, event, fields);
    }

    /// Process-level error record without correlation fields.
    pub fn error(&self, event: &str, fields: Value) {
        emit(&*self.sink, &self.base, Level::Error, event, fields);
    }
}

/// Logger bound to a single request.
#[derive(Clone)]
pub struct RequestLogger {
    sink: Arc<dyn LogSink>,
    bound: Arc<Fields>,
    origin: Instant,
}

impl RequestLogger {
    pub fn info(&self, event: &str, fields: Value) {
        emit(&*self.sink, &self.bound, Level::Info, event, fields);
    }

    pub fn error(&self, event: &str, fields: Value) {
        emit(&*self.sink, &self.bound, Level::Error, event, fields);
    }

    /// Nanoseconds since the base logger was created. Monotonic.
    pub fn monotonic_ns(&self, at: Instant) -> u128 {
        at.saturating_duration_since(self.origin).as_nanos()
    }
}

fn emit(sink: &dyn LogSink, bound: &Fields, level: Level, event: &str, fields: Value) {
    let mut merged = match fields {
        Value::Object(map) => map,
        Value::Null => Fields::new(),
        other => {
            let mut map = Fields::new();
            map.insert("data".into(), other);
            map
        }
    };
    merged.insert(
        "@timestamp".into(),
        Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    for (k, v) in bound {
        merged.insert(k.clone(), v.clone());
    }

    sink.write(LogRecord {
        level,
        event: event.to_string(),
        fields: merged,
    });
}
