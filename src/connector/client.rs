//! Connector REST API client.
//!
//! # Responsibilities
//! - List connectors registered with the connector service
//! - Look up the sink connector by name
//! - Create it when missing ("ensure configured", idempotent)

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use crate::config::ConnectorConfig;

/// Connector definition as exchanged with the connector service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    pub name: String,
    pub config: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<Value>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub connector_type: Option<String>,
}

impl Connector {
    /// Desired sink connector for the given configuration.
    pub fn sink(config: &ConnectorConfig, ingest_topic: &str) -> Self {
        let topics = if config.topics.is_empty() {
            ingest_topic.to_string()
        } else {
            config.topics.join(",")
        };

        let settings: BTreeMap<String, String> = [
            ("connector.class", config.connector_class.as_str()),
            ("tasks.max", "1"),
            ("topics", topics.as_str()),
            ("key.ignore", "true"),
            ("schema.ignore", "true"),
            ("connection.url", config.connection_url.as_str()),
            ("type.name", "_doc"),
            ("name", config.name.as_str()),
            ("value.converter", "org.apache.kafka.connect.json.JsonConverter"),
            ("value.converter.schemas.enable", "false"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            name: config.name.clone(),
            config: settings,
            tasks: Vec::new(),
            connector_type: None,
        }
    }
}

/// Control plane call failures.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("connector service unreachable: {0}")]
    Request(#[from] reqwest::Error),

    #[error("connector service answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("connector '{0}' was created concurrently and could not be read back")]
    Conflict(String),
}

/// Result of an ensure call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsureOutcome {
    pub connector: Connector,
    pub created: bool,
}

#[derive(Clone)]
pub struct ConnectorClient {
    http: reqwest::Client,
    endpoint: String,
    desired: Connector,
}

impl ConnectorClient {
    pub fn new(config: &ConnectorConfig, ingest_topic: &str) -> Result<Self, ConnectorError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            desired: Connector::sink(config, ingest_topic),
        })
    }

    pub fn desired(&self) -> &Connector {
        &self.desired
    }

    /// Names of all registered connectors.
    pub async fn list(&self) -> Result<Vec<String>, ConnectorError> {
        let response = self.http.get(&self.endpoint).send().await?;
        let response = expect_success(response).await?;
        Ok(response.json().await?)
    }

    /// Look up a connector; `None` when it does not exist.
    pub async fn get(&self, name: &str) -> Result<Option<Connector>, ConnectorError> {
        let response = self
            .http
            .get(format!("{}/{}", self.endpoint, name))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = expect_success(response).await?;
        Ok(Some(response.json().await?))
    }

    /// Register a connector.
    pub async fn create(&self, connector: &Connector) -> Result<Connector, ConnectorError> {
        let response = self.http.post(&self.endpoint).json(connector).send().await?;
        let response = expect_success(response).await?;
        Ok(response.json().await?)
    }

    /// Make sure the sink connector exists, creating it if needed.
    pub async fn ensure(&self) -> Result<EnsureOutcome, ConnectorError> {
        if let Some(existing) = self.get(&self.desired.name).await? {
            return Ok(EnsureOutcome {
                connector: existing,
                created: false,
            });
        }

        match self.create(&self.desired).await {
            Ok(connector) => Ok(EnsureOutcome {
                connector,
                created: true,
            }),
            // Someone else created it between our lookup and create.
            Err(ConnectorError::Status { status: 409, .. }) => self
                .get(&self.desired.name)
                .await?
                .map(|connector| EnsureOutcome {
                    connector,
                    created: false,
                })
                .ok_or_else(|| ConnectorError::Conflict(self.desired.name.clone())),
            Err(e) => Err(e),
        }
    }
}

async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, ConnectorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ConnectorError::Status {
        status: status.as_u16(),
        body,
    })
}
