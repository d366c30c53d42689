//! Ingest request pipeline.
//!
//! ```text
//! Received → Correlated → BodyDecoded → Published → Logged → Responded
//!                 │              │
//!                 └──────────────┴──→ Failed(kind)
//! ```
//!
//! Correlation happens in middleware; the handler hands the context, the
//! bound logger and the raw body to [`RequestPipeline::ingest`].

use axum::{
    body::Bytes,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::correlation::CorrelationContext;
use crate::event::{build_envelope, envelope::excerpt, EnvelopeError, EnvelopeSpec, EventEnvelope};
use crate::http::response::{Accepted, ApiError};
use crate::observability::RequestLogger;
use crate::publish::{PublishError, PublishGateway, PublishResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    MalformedInput,
    Encoding,
    Publish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Correlated,
    BodyDecoded,
    Published,
    Logged,
    Responded,
    Failed(FailureKind),
}

impl Stage {
    fn can_advance_to(self, next: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, next),
            (Received, Correlated)
                | (Correlated, BodyDecoded)
                | (Correlated, Failed(FailureKind::MalformedInput))
                | (BodyDecoded, Published)
                | (BodyDecoded, Failed(FailureKind::Encoding))
                | (BodyDecoded, Failed(FailureKind::Publish))
                | (Published, Logged)
                | (Logged, Responded)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: Stage,
    pub to: Stage,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid pipeline transition {:?} -> {:?}", self.from, self.to)
    }
}

impl std::error::Error for InvalidTransition {}

/// Stages one request went through, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trail {
    stages: Vec<Stage>,
}

impl Trail {
    pub fn start() -> Self {
        Self {
            stages: vec![Stage::Received],
        }
    }

    pub fn current(&self) -> Stage {
        self.stages.last().copied().unwrap_or(Stage::Received)
    }

    pub fn advance(&mut self, next: Stage) -> Result<(), InvalidTransition> {
        let from = self.current();
        if !from.can_advance_to(next) {
            return Err(InvalidTransition { from, to: next });
        }
        self.stages.push(next);
        Ok(())
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Advance along a transition the pipeline itself controls. A refusal
    /// here is a bug, so it is logged and the trail left unchanged.
    fn step(&mut self, next: Stage) {
        if let Err(e) = self.advance(next) {
            tracing::error!(error = %e, "Pipeline state machine violated");
        }
    }
}

/// Result of one ingest run; renders as the HTTP response.
#[derive(Debug)]
pub struct IngestOutcome {
    pub trail: Trail,
    pub result: Result<PublishResult, ApiError>,
}

impl IntoResponse for IngestOutcome {
    fn into_response(self) -> Response {
        match self.result {
            Ok(_) => Accepted::default().into_response(),
            Err(e) => e.into_response(),
        }
    }
}

/// Correlate → validate → publish → acknowledge → log.
pub struct RequestPipeline {
    gateway: PublishGateway,
    topic: String,
    spec: EnvelopeSpec,
}

impl RequestPipeline {
    pub fn new(gateway: PublishGateway, topic: impl Into<String>, spec: EnvelopeSpec) -> Self {
        Self {
            gateway,
            topic: topic.into(),
            spec,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn gateway(&self) -> &PublishGateway {
        &self.gateway
    }

    pub async fn ingest(
        &self,
        ctx: &CorrelationContext,
        logger: &RequestLogger,
        body: Bytes,
    ) -> IngestOutcome {
        let mut trail = Trail::start();
        trail.step(Stage::Correlated);

        let envelope = match build_envelope(&body, ctx, &self.spec) {
            Ok(envelope) => {
                trail.step(Stage::BodyDecoded);
                envelope
            }
            Err(e) => {
                trail.step(Stage::Failed(FailureKind::MalformedInput));
                let payload = match &e {
                    EnvelopeError::MalformedInput { excerpt, .. } => excerpt.clone(),
                    _ => excerpt(&body),
                };
                logger.info(
                    "ingest.rejected",
                    json!({ "reason": e.to_string(), "payload": payload }),
                );
                return IngestOutcome {
                    trail,
                    result: Err(e.into()),
                };
            }
        };

        // Records are written from the publish task itself, so they land
        // even if this future is dropped before the broker answers.
        let task_logger = logger.clone();
        let topic = self.topic.clone();
        let result = self
            .gateway
            .publish_detached(self.topic.clone(), envelope, move |envelope, result| {
                record_outcome(&task_logger, &topic, envelope, result)
            })
            .await;

        let outcome = match result {
            Ok(placement) => {
                trail.step(Stage::Published);
                trail.step(Stage::Logged);
                trail.step(Stage::Responded);
                IngestOutcome {
                    trail,
                    result: Ok(placement),
                }
            }
            Err(e) => {
                let kind = if e.is_encoding() {
                    FailureKind::Encoding
                } else {
                    FailureKind::Publish
                };
                trail.step(Stage::Failed(kind));
                if let PublishError::Aborted { .. } = e {
                    // The task died before it could write its own record.
                    logger.error(
                        "publish.failed",
                        json!({ "topic": self.topic, "kind": e.kind(), "error": e.to_string() }),
                    );
                }
                IngestOutcome {
                    trail,
                    result: Err(e.into()),
                }
            }
        };
        tracing::debug!(stages = ?outcome.trail.stages(), "Ingest finished");
        outcome
    }
}

fn record_outcome(
    logger: &RequestLogger,
    topic: &str,
    envelope: &EventEnvelope,
    result: &Result<PublishResult, PublishError>,
) {
    match result {
        Ok(placement) => logger.info(
            "publish.result",
            json!({
                "topic": topic,
                "partition": placement.partition,
                "offset": placement.offset,
                "result": format!(
                    "Partition: {}, Offset: {}",
                    placement.partition, placement.offset
                ),
                "header": envelope.header,
                "body": envelope.body,
            }),
        ),
        Err(e) => logger.error(
            "publish.failed",
            json!({
                "topic": topic,
                "kind": e.kind(),
                "error": e.to_string(),
                "header": envelope.header,
            }),
        ),
    }
}
