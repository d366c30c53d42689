//! Trace identity derived from inbound request headers.

use axum::http::{HeaderMap, HeaderValue};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use uuid::Uuid;

use crate::correlation::fingerprint::{ClientFingerprint, HostIdentity};

/// Request (trace) identifier header, echoed on every response.
pub const X_REQUEST_ID: &str = "x-request-id";
/// Caller's span, which becomes this request's parent.
pub const X_PARENT_ID: &str = "x-parent-id";
/// Client session identifier.
pub const X_SESSION_ID: &str = "x-session-id";

/// Longest identifier accepted from a header.
const MAX_ID_LEN: usize = 128;

/// Trace identity of one inbound request.
///
/// Created once at request entry and handed to every step of the request
/// explicitly. All four identifiers are always non-empty.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationContext {
    pub request_id: String,
    pub parent_id: String,
    pub span_id: String,
    pub session_id: String,
    pub client: ClientFingerprint,
}

impl CorrelationContext {
    /// Derive the trace identity from inbound headers.
    ///
    /// Never fails: absent or malformed headers fall back to fresh ids.
    /// `span_id` is always new and distinct from the request and parent ids.
    pub fn derive(headers: &HeaderMap) -> Self {
        let request_id = header_id(headers, X_REQUEST_ID).unwrap_or_else(new_id);
        let parent_id = header_id(headers, X_PARENT_ID).unwrap_or_else(new_id);
        let session_id =
            header_id(headers, X_SESSION_ID).unwrap_or_else(|| request_id.clone());

        let mut span_id = new_id();
        while span_id == request_id || span_id == parent_id {
            span_id = new_id();
        }

        Self {
            request_id,
            parent_id,
            span_id,
            session_id,
            client: ClientFingerprint::from_headers(headers),
        }
    }

    /// Attach the peer socket address to the fingerprint.
    pub fn with_remote_addr(mut self, addr: Option<SocketAddr>) -> Self {
        self.client.set_remote_addr(addr);
        self
    }

    /// Attach the host identity detected at startup.
    pub fn with_host(mut self, host: Arc<HostIdentity>) -> Self {
        self.client.host = Some(host);
        self
    }

    /// Write the request id into `headers` so later derivations over the
    /// same request observe the same id.
    pub fn stamp(&self, headers: &mut HeaderMap) {
        if let Ok(value) = HeaderValue::from_str(&self.request_id) {
            headers.insert(X_REQUEST_ID, value);
        }
    }

    /// Header value carrying the request id, for the response.
    pub fn request_id_header(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.request_id).ok()
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Read an identifier header, treating anything unusable as absent.
fn header_id(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(name)?.to_str().ok()?.trim();
    let usable = !raw.is_empty()
        && raw.len() <= MAX_ID_LEN
        && raw.bytes().all(|b| b.is_ascii_graphic());
    usable.then(|| raw.to_string())
}
