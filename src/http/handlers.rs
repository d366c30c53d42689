//! Route handlers.

use axum::{
    body::Bytes,
    extract::{Extension, State},
    Json,
};
use serde_json::{json, Value};

use crate::connector::Connector;
use crate::correlation::CorrelationContext;
use crate::http::pipeline::IngestOutcome;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::RequestLogger;

/// `GET /topics`: connectors registered with the control plane.
pub async fn topics(
    State(state): State<AppState>,
    Extension(logger): Extension<RequestLogger>,
) -> Result<Json<Vec<String>>, ApiError> {
    match state.connectors.list().await {
        Ok(names) => Ok(Json(names)),
        Err(e) => {
            logger.error(
                "connector.failed",
                json!({ "operation": "list", "error": e.to_string() }),
            );
            Err(e.into())
        }
    }
}

/// `GET /topic`: ensure the sink connector exists and return it.
pub async fn topic(
    State(state): State<AppState>,
    Extension(logger): Extension<RequestLogger>,
) -> Result<Json<Connector>, ApiError> {
    match state.connectors.ensure().await {
        Ok(outcome) => {
            logger.info(
                "connector.ensured",
                json!({ "connector": outcome.connector.name, "created": outcome.created }),
            );
            Ok(Json(outcome.connector))
        }
        Err(e) => {
            logger.error(
                "connector.failed",
                json!({ "operation": "ensure", "error": e.to_string() }),
            );
            Err(e.into())
        }
    }
}

/// `POST /logging`: wrap the body in an envelope and publish it.
pub async fn logging(
    State(state): State<AppState>,
    Extension(ctx): Extension<CorrelationContext>,
    Extension(logger): Extension<RequestLogger>,
    body: Bytes,
) -> IngestOutcome {
    state.pipeline.ingest(&ctx, &logger, body).await
}

/// `GET /health`: liveness.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "broker": state.pipeline.gateway().broker_name(),
        "topic": state.pipeline.topic(),
    }))
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("no such route")
}
