//! Response shapes shared by all routes.
//!
//! # Responsibilities
//! - Map domain errors to HTTP status codes
//! - Render error bodies as `{statusCode, error, message}`
//! - Render the ingest acknowledgement

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::connector::ConnectorError;
use crate::event::EnvelopeError;
use crate::publish::PublishError;

/// Error body returned to HTTP clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    #[serde(serialize_with = "status_code")]
    pub status_code: StatusCode,
    pub error: String,
    pub message: String,
}

fn status_code<S: serde::Serializer>(status: &StatusCode, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u16(status.as_u16())
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code: status,
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code, Json(self)).into_response()
    }
}

impl From<EnvelopeError> for ApiError {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::MalformedInput { .. } => Self::bad_request(err.to_string()),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<PublishError> for ApiError {
    fn from(err: PublishError) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<ConnectorError> for ApiError {
    fn from(err: ConnectorError) -> Self {
        Self::internal(err.to_string())
    }
}

/// Rewrite error responses produced outside the handlers (body limit,
/// timeout, method mismatch) into the `ApiError` shape. Headers such as
/// `allow` are kept.
pub async fn normalize_error(response: Response) -> Response {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) || is_json(&response) {
        return response;
    }

    let message = match status {
        StatusCode::REQUEST_TIMEOUT => "request did not complete in time",
        StatusCode::PAYLOAD_TOO_LARGE => "request body exceeds the configured limit",
        StatusCode::METHOD_NOT_ALLOWED => "method not allowed on this route",
        _ => status.canonical_reason().unwrap_or("request failed"),
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_TYPE);
    parts.headers.remove(header::CONTENT_LENGTH);
    let mut rewritten = ApiError::new(status, message).into_response();
    rewritten.headers_mut().extend(parts.headers);
    rewritten
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

/// Body of a successful ingest.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Accepted {
    message: &'static str,
}

impl Default for Accepted {
    fn default() -> Self {
        Self { message: "success" }
    }
}

impl IntoResponse for Accepted {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}
