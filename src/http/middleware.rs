//! Correlation and access logging middleware.
//!
//! Runs around every route, including the fallback:
//! 1. Derive the [`CorrelationContext`] and stamp the request id back
//!    into the request headers
//! 2. Bind a [`RequestLogger`] and hand both to handlers as extensions
//! 3. After the handler, echo `x-request-id` and emit `http.request`

use axum::{
    body::{Body, HttpBody},
    extract::{ConnectInfo, MatchedPath, Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::{Local, SecondsFormat, Utc};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Instant;

use crate::correlation::{CorrelationContext, X_REQUEST_ID};
use crate::http::server::AppState;
use crate::observability::{metrics, RequestLogger};

pub async fn correlate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let start = Instant::now();

    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ctx = CorrelationContext::derive(req.headers())
        .with_remote_addr(remote)
        .with_host(state.host.clone());
    ctx.stamp(req.headers_mut());
    let logger = state.logger.bind(&ctx);

    let summary = RequestSummary::capture(&req);
    req.extensions_mut().insert(ctx.clone());
    req.extensions_mut().insert(logger.clone());

    let mut response = next.run(req).await;

    if let Some(value) = ctx.request_id_header() {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }

    let status = response.status().as_u16();
    summary.emit(&logger, &ctx, &response, start);
    metrics::record_request(&summary.method, &summary.route, status, start);

    response
}

/// Request attributes captured before the request moves into the handler.
struct RequestSummary {
    method: String,
    path: String,
    route: String,
    query: Option<String>,
    protocol: String,
    host: Option<String>,
    content_type: Option<String>,
    request_size: Option<u64>,
}

impl RequestSummary {
    fn capture(req: &Request) -> Self {
        let headers = req.headers();
        let header_str = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        Self {
            method: req.method().to_string(),
            path: req.uri().path().to_string(),
            route: req
                .extensions()
                .get::<MatchedPath>()
                .map(|p| p.as_str().to_string())
                .unwrap_or_else(|| "unmatched".to_string()),
            query: req.uri().query().map(str::to_string),
            protocol: format!("{:?}", req.version()),
            host: header_str(header::HOST),
            content_type: header_str(header::CONTENT_TYPE),
            request_size: body_size(req.body()),
        }
    }

    fn emit(&self, logger: &RequestLogger, ctx: &CorrelationContext, response: &Response, start: Instant) {
        let now = Utc::now();
        let latency = start.elapsed();

        logger.info(
            "http.request",
            json!({
                "method": self.method,
                "path": self.path,
                "query": self.query,
                "status": response.status().as_u16(),
                "latency_ms": latency.as_secs_f64() * 1000.0,
                "request_size": self.request_size,
                "response_size": body_size(response.body()),
                "protocol": self.protocol,
                "host": self.host,
                "content_type": self.content_type,
                "timezone": Local::now().offset().to_string(),
                "iso_time": now.to_rfc3339_opts(SecondsFormat::Millis, true),
                "unix_time_ns": now.timestamp_nanos_opt().map_or(Value::Null, Value::from),
                "monotonic_ns": logger.monotonic_ns(Instant::now()) as u64,
                "client": ctx.client,
            }),
        );
    }
}

/// Exact body length when known without reading the body.
fn body_size(body: &Body) -> Option<u64> {
    body.size_hint().exact()
}
