//! Scheduled connector reconciliation.
//!
//! Runs outside the request path: one pass at startup, then one per
//! interval. Each pass retries with backoff before giving up until the
//! next one.

use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::ConnectorConfig;
use crate::connector::client::{ConnectorClient, ConnectorError, EnsureOutcome};
use crate::observability::metrics;
use crate::resilience::Backoff;

pub struct ConnectorReconciler {
    client: ConnectorClient,
    interval: Option<Duration>,
    backoff: Backoff,
}

impl ConnectorReconciler {
    pub fn new(client: ConnectorClient, config: &ConnectorConfig) -> Self {
        Self {
            client,
            interval: (config.reconcile_interval_secs > 0)
                .then(|| Duration::from_secs(config.reconcile_interval_secs)),
            backoff: Backoff {
                max_attempts: config.max_attempts,
                base_ms: config.base_delay_ms,
                max_ms: config.max_delay_ms,
            },
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            connector = %self.client.desired().name,
            interval = ?self.interval,
            "Connector reconciler starting"
        );

        if self.pass(&mut shutdown).await.is_none() {
            return;
        }
        let Some(interval) = self.interval else {
            return;
        };

        let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.pass(&mut shutdown).await.is_none() {
                        break;
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
        tracing::info!("Connector reconciler stopped");
    }

    /// One reconcile pass with retries. `None` when shutdown interrupted it.
    async fn pass(
        &self,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Option<Result<EnsureOutcome, ConnectorError>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.ensure().await {
                Ok(outcome) => {
                    metrics::record_reconcile(if outcome.created { "created" } else { "present" });
                    tracing::info!(
                        connector = %outcome.connector.name,
                        created = outcome.created,
                        "Connector reconciled"
                    );
                    return Some(Ok(outcome));
                }
                Err(e) => {
                    metrics::record_reconcile("failed");
                    let Some(delay) = self.backoff.after_failure(attempt) else {
                        tracing::error!(attempts = attempt, error = %e, "Connector reconcile gave up");
                        return Some(Err(e));
                    };
                    tracing::warn!(attempt, delay = ?delay, error = %e, "Connector reconcile failed, retrying");
                    tokio::select! {
                        _ = time::sleep(delay) => {}
                        _ = shutdown.recv() => return None,
                    }
                }
            }
        }
    }
}
