//! Event envelope construction and wire form.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::correlation::CorrelationContext;

/// Longest payload excerpt kept in rejection logs.
pub const PAYLOAD_EXCERPT_LEN: usize = 256;

/// Canonical event wrapper: handler-controlled header plus opaque body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub header: EventHeader,
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventHeader {
    /// UTC RFC 3339 with milliseconds, e.g. `2024-05-01T10:00:00.000Z`.
    pub timestamp: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub event_name: String,
    pub session_id: String,
    #[serde(default)]
    pub user_id: String,
}

/// Names assigned by the handler producing the envelope.
#[derive(Debug, Clone)]
pub struct EnvelopeSpec {
    pub event_name: String,
    pub event_type: String,
}

/// Errors from decoding inbound payloads or wire messages.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The caller sent something that is not valid JSON.
    #[error("malformed input: {source}")]
    MalformedInput {
        #[source]
        source: serde_json::Error,
        /// Leading part of the offending payload, for logs.
        excerpt: String,
    },

    /// A wire message does not have the envelope shape.
    #[error("invalid envelope: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("envelope could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Header fields a caller may supply.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallerHeader {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

/// Inbound payload: either a pre-wrapped `{header, body}` object or any
/// other JSON value, which becomes the body as is.
#[derive(Deserialize)]
#[serde(untagged)]
enum Inbound {
    Wrapped(Wrapped),
    Bare(Value),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Wrapped {
    header: CallerHeader,
    body: Value,
}

/// Build an envelope from a raw request body.
///
/// `timestamp`, `type` and `eventName` always come from the handler.
/// `sessionId` falls back to the context's session when the caller gave none.
pub fn build_envelope(
    raw_body: &[u8],
    ctx: &CorrelationContext,
    spec: &EnvelopeSpec,
) -> Result<EventEnvelope, EnvelopeError> {
    // Validate as plain JSON first so the error points at the payload.
    let value: Value =
        serde_json::from_slice(raw_body).map_err(|source| EnvelopeError::MalformedInput {
            source,
            excerpt: excerpt(raw_body),
        })?;

    let (caller, body) = match serde_json::from_value::<Inbound>(value) {
        Ok(Inbound::Wrapped(w)) => (w.header, w.body),
        Ok(Inbound::Bare(body)) => (CallerHeader::default(), body),
        Err(source) => {
            return Err(EnvelopeError::MalformedInput {
                source,
                excerpt: excerpt(raw_body),
            })
        }
    };

    let session_id = caller
        .session_id
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| ctx.session_id.clone());

    Ok(EventEnvelope {
        header: EventHeader {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            event_type: spec.event_type.clone(),
            event_name: spec.event_name.clone(),
            session_id,
            user_id: caller.user_id.unwrap_or_default(),
        },
        body,
    })
}

/// Wire form of an envelope.
pub fn encode(envelope: &EventEnvelope) -> Result<Vec<u8>, EnvelopeError> {
    serde_json::to_vec(envelope).map_err(EnvelopeError::Encode)
}

/// Parse an envelope from its wire form.
pub fn decode(bytes: &[u8]) -> Result<EventEnvelope, EnvelopeError> {
    serde_json::from_slice(bytes).map_err(EnvelopeError::Decode)
}

/// First [`PAYLOAD_EXCERPT_LEN`] characters of a payload, lossily decoded.
pub fn excerpt(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .chars()
        .take(PAYLOAD_EXCERPT_LEN)
        .collect()
}
