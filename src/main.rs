//! Event relay
//!
//! Accepts events over HTTP, wraps them in a correlated envelope and
//! publishes them to Kafka, waiting for the broker's placement before
//! answering.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                     EVENT RELAY                       │
//!                 │                                                       │
//!   POST /logging │  ┌────────────┐   ┌──────────┐   ┌───────────────┐    │
//!   ──────────────┼─▶│ middleware │──▶│ pipeline │──▶│ publish       │────┼──▶ Kafka
//!                 │  │ correlate  │   │ envelope │   │ gateway       │    │
//!                 │  └─────┬──────┘   └────┬─────┘   └───────────────┘    │
//!                 │        │ records       │ records                      │
//!                 │        ▼               ▼                              │
//!                 │  ┌────────────────────────────┐                       │
//!                 │  │ structured logger → sink   │───────────────────────┼──▶ stdout
//!                 │  └────────────────────────────┘                       │
//!                 │                                                       │
//!   GET /topic(s) │  ┌────────────────────────────┐                       │
//!   ──────────────┼─▶│ connector client           │───────────────────────┼──▶ Kafka Connect
//!                 │  │ + scheduled reconciler     │                       │
//!                 │  └────────────────────────────┘                       │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use event_relay::config::{load_config, loader::load_dev_env};
use event_relay::http::HttpServer;
use event_relay::lifecycle::{signals, Shutdown};
use event_relay::observability::{logging, metrics, StructuredLogger};
use event_relay::publish;

#[derive(Parser)]
#[command(name = "event-relay")]
#[command(about = "Correlating HTTP to Kafka event relay", long_about = None)]
struct Args {
    /// TOML configuration file. Environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    load_dev_env();

    let config = load_config(args.config.as_deref())?;
    logging::init_logging(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "event-relay starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        brokers = %config.broker.bootstrap_servers(),
        topic = %config.ingest.topic,
        publish_timeout = ?config.broker.publish_timeout(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let records = logging::RecordSink::from_config(&config.observability);
    let logger = StructuredLogger::new(records.sink.clone());

    // An unreachable broker is fatal before we accept any traffic.
    let gateway = match publish::connect(&config.broker).await {
        Ok(gateway) => gateway,
        Err(e) => {
            tracing::error!(error = %e, "Broker unreachable at startup");
            return Err(e.into());
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(signals::listen(shutdown.clone()));

    let server = HttpServer::new(config, gateway.clone(), logger)?;
    let served = server.run(listener, shutdown.subscribe()).await;

    // Stop background tasks even if the server exited on its own.
    shutdown.trigger();

    if let Err(e) = gateway.close().await {
        tracing::error!(error = %e, "Broker flush failed during shutdown");
    }
    records.drain().await;

    served?;
    tracing::info!("Shutdown complete");
    Ok(())
}
