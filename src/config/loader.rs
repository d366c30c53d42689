//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {var}: '{value}'")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: optional TOML file, then environment overrides,
/// then validation. The result is never mutated afterwards.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ServiceConfig::default(),
    };

    apply_env(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load `.env.dev` unless running in release mode (`RELAY_MODE=release`).
pub fn load_dev_env() {
    if std::env::var("RELAY_MODE").as_deref() != Ok("release") {
        let _ = dotenvy::from_filename(".env.dev");
    }
}

/// Overlay environment variables onto `config`.
///
/// `lookup` abstracts the environment so tests need not touch process state.
pub fn apply_env<F>(config: &mut ServiceConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(brokers) = get("KAFKA_BROKERS") {
        config.broker.brokers = split_list(&brokers);
    }
    if let Some(port) = get("PORT") {
        let port: u16 = port.trim().parse().map_err(|_| ConfigError::Env {
            var: "PORT",
            value: port.clone(),
        })?;
        let host = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        config.listener.bind_address = format!("{host}:{port}");
    }
    if let Some(topics) = get("TOPIC_NAMES") {
        config.connector.topics = split_list(&topics);
    }
    if let Some(topic) = get("INGEST_TOPIC") {
        config.ingest.topic = topic;
    }
    if let Some(name) = get("EVENT_NAME") {
        config.ingest.event_name = name;
    }
    if let Some(url) = get("CONNECTOR_URL") {
        config.connector.endpoint = url;
    }
    if let Some(timeout) = get("PUBLISH_TIMEOUT_MS") {
        let ms: u64 = timeout.trim().parse().map_err(|_| ConfigError::Env {
            var: "PUBLISH_TIMEOUT_MS",
            value: timeout.clone(),
        })?;
        config.broker.publish_timeout_ms = Some(ms);
    }
    if let Some(level) = get("LOG_LEVEL") {
        config.observability.log_level = level;
    }

    Ok(())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ServiceConfig::default();
        apply_env(
            &mut config,
            env(&[
                ("KAFKA_BROKERS", "k1:9092, k2:9092,"),
                ("PORT", "3000"),
                ("TOPIC_NAMES", "a,b"),
                ("PUBLISH_TIMEOUT_MS", "1500"),
            ]),
        )
        .unwrap();

        assert_eq!(config.broker.brokers, vec!["k1:9092", "k2:9092"]);
        assert_eq!(config.listener.bind_address, "0.0.0.0:3000");
        assert_eq!(config.connector.topics, vec!["a", "b"]);
        assert_eq!(config.broker.publish_timeout_ms, Some(1500));
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let mut config = ServiceConfig::default();
        apply_env(&mut config, env(&[("KAFKA_BROKERS", "  "), ("PORT", "")])).unwrap();
        assert_eq!(config.broker.brokers, vec!["localhost:9092"]);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn test_bad_port_is_rejected() {
        let mut config = ServiceConfig::default();
        let err = apply_env(&mut config, env(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "PORT", .. }));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("relay-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, "[ingest]\ntopic = \"audit\"\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(config.ingest.topic, "audit");
    }
}
