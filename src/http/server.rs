//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the axum router with all handlers
//! - Wire up middleware (tracing, timeout, body limit, correlation)
//! - Start the connector reconciler alongside the listener
//! - Drain in-flight requests on shutdown, bounded by the grace period

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServiceConfig;
use crate::connector::{ConnectorClient, ConnectorError, ConnectorReconciler};
use crate::correlation::HostIdentity;
use crate::event::EnvelopeSpec;
use crate::http::{
    handlers, middleware::correlate, pipeline::RequestPipeline, response::normalize_error,
};
use crate::observability::StructuredLogger;
use crate::publish::PublishGateway;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("listener failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("connector client could not be built: {0}")]
    Connector(#[from] ConnectorError),
}

/// Application state injected into handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub logger: StructuredLogger,
    pub pipeline: Arc<RequestPipeline>,
    pub connectors: ConnectorClient,
    pub host: Arc<HostIdentity>,
}

pub struct HttpServer {
    state: AppState,
}

impl HttpServer {
    pub fn new(
        config: ServiceConfig,
        gateway: PublishGateway,
        logger: StructuredLogger,
    ) -> Result<Self, ServerError> {
        let connectors = ConnectorClient::new(&config.connector, &config.ingest.topic)?;
        let pipeline = RequestPipeline::new(
            gateway,
            config.ingest.topic.clone(),
            EnvelopeSpec {
                event_name: config.ingest.event_name.clone(),
                event_type: config.ingest.event_type.clone(),
            },
        );

        Ok(Self {
            state: AppState {
                config: Arc::new(config),
                logger,
                pipeline: Arc::new(pipeline),
                connectors,
                host: Arc::new(HostIdentity::detect()),
            },
        })
    }

    /// The full router with middleware, without a listener.
    ///
    /// `/logging` is left out of the request timeout: an ingest is bounded
    /// only by the publish wait policy, so a slow broker never cuts off the
    /// response after the write went through.
    #[allow(deprecated)]
    pub fn router(&self) -> Router {
        let listener = &self.state.config.listener;
        let bounded = Router::new()
            .route("/topics", get(handlers::topics))
            .route("/topic", get(handlers::topic))
            .route("/health", get(handlers::health))
            .layer(TimeoutLayer::new(Duration::from_secs(listener.request_timeout_secs)));

        Router::new()
            .route("/logging", post(handlers::logging))
            .merge(bounded)
            .fallback(handlers::not_found)
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(listener.max_body_bytes))
            .layer(middleware::map_response(normalize_error))
            .layer(middleware::from_fn_with_state(self.state.clone(), correlate))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve until `shutdown` fires, then drain for at most the grace period.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        let config = self.state.config.clone();
        tracing::info!(address = %addr, topic = %config.ingest.topic, "HTTP server starting");

        let reconciler = ConnectorReconciler::new(self.state.connectors.clone(), &config.connector);
        tokio::spawn(reconciler.run(shutdown.resubscribe()));

        let mut grace_signal = shutdown.resubscribe();
        let grace = Duration::from_secs(config.lifecycle.shutdown_grace_secs);

        let app = self.router().into_make_service_with_connect_info::<SocketAddr>();
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining requests");
            })
            .into_future();
        tokio::pin!(serve);

        tokio::select! {
            result = &mut serve => result?,
            _ = async {
                let _ = grace_signal.recv().await;
                tokio::time::sleep(grace).await;
            } => {
                tracing::warn!(grace_secs = grace.as_secs(), "Grace period elapsed, dropping in-flight requests");
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PublishTimeout;
    use crate::correlation::X_REQUEST_ID;
    use crate::observability::MemorySink;
    use crate::publish::MemoryBroker;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    fn server() -> (HttpServer, Arc<MemoryBroker>, Arc<MemorySink>) {
        let broker = Arc::new(MemoryBroker::new(1));
        let sink = Arc::new(MemorySink::new());
        let gateway = PublishGateway::new(broker.clone(), PublishTimeout::Unbounded);
        let server = HttpServer::new(
            ServiceConfig::default(),
            gateway,
            StructuredLogger::new(sink.clone()),
        )
        .unwrap();
        (server, broker, sink)
    }

    #[tokio::test]
    async fn test_generated_request_id_is_echoed() {
        let (server, _, sink) = server();
        let response = server
            .router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let id = response.headers()[X_REQUEST_ID].to_str().unwrap().to_string();
        assert!(uuid::Uuid::parse_str(&id).is_ok());

        let access = sink.events("http.request");
        assert_eq!(access.len(), 1);
        assert_eq!(access[0].get_str("request_id"), Some(id.as_str()));
        assert_eq!(access[0].get("status"), Some(&Value::from(200)));
    }

    #[tokio::test]
    async fn test_inbound_request_id_is_echoed_unchanged() {
        let (server, _, _) = server();
        let response = server
            .router()
            .oneshot(
                Request::get("/health")
                    .header(X_REQUEST_ID, "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()[X_REQUEST_ID], "abc-123");
    }

    #[tokio::test]
    async fn test_ingest_records_share_correlation_pair() {
        let (server, broker, sink) = server();
        let response = server
            .router()
            .oneshot(
                Request::post("/logging")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"action":"click"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let id = response.headers()[X_REQUEST_ID].to_str().unwrap().to_string();
        let body: Value =
            serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({ "message": "success" }));
        assert_eq!(broker.len(), 1);

        let records = sink.for_request(&id);
        assert_eq!(records.len(), 2);
        let span = records[0].get_str("span_id").unwrap();
        assert!(records.iter().all(|r| r.get_str("span_id") == Some(span)));
    }

    #[tokio::test]
    async fn test_unknown_route_uses_error_shape() {
        let (server, _, _) = server();
        let response = server
            .router()
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key(X_REQUEST_ID));
        let body: Value =
            serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(body["statusCode"], 404);
    }
}
