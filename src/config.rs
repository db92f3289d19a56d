use std::time::Duration;

use crate::messaging::PublisherConfig;
use crate::utils::RetryConfig;

// ============================================================================
// Service Configuration
// ============================================================================
//
// | Variable              | Default          | Meaning                          |
// |-----------------------|------------------|----------------------------------|
// | PORT                  | 8080             | HTTP listen port                 |
// | METRICS_PORT          | 9090             | /metrics and /health port        |
// | ORDERS_TOPIC          | (required)       | topic OrderCreated events go to  |
// | BUS_REGION            | (required)       | region reported by the bus client|
// | BUS_ENDPOINT_URL      | 127.0.0.1:9092   | broker list override             |
// | PUBLISH_TIMEOUT_MS    | 5000             | deadline for one publish call    |
// | PUBLISH_MAX_ATTEMPTS  | 1                | attempts for unsent messages     |
// | MAX_BODY_BYTES        | 262144           | request body limit               |
//
// ============================================================================

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_METRICS_PORT: u16 = 9090;
const DEFAULT_PUBLISH_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_MAX_BODY_BYTES: usize = 256 * 1024;

/// Startup-fatal configuration problems.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to create message bus client: {0}")]
    BusClient(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub metrics_port: u16,
    pub max_body_bytes: usize,
    pub publisher: PublisherConfig,
    pub retry: RetryConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let destination_id = get("ORDERS_TOPIC").ok_or(ConfigError::MissingField { field: "ORDERS_TOPIC" })?;
        let region = get("BUS_REGION").ok_or(ConfigError::MissingField { field: "BUS_REGION" })?;

        let publish_timeout_ms = parse_or(get("PUBLISH_TIMEOUT_MS"), "PUBLISH_TIMEOUT_MS", DEFAULT_PUBLISH_TIMEOUT_MS)?;
        if publish_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "PUBLISH_TIMEOUT_MS",
                reason: "must be greater than zero".to_string(),
            });
        }

        let max_attempts: u32 = parse_or(get("PUBLISH_MAX_ATTEMPTS"), "PUBLISH_MAX_ATTEMPTS", 1)?;

        Ok(Self {
            port: parse_or(get("PORT"), "PORT", DEFAULT_PORT)?,
            metrics_port: parse_or(get("METRICS_PORT"), "METRICS_PORT", DEFAULT_METRICS_PORT)?,
            max_body_bytes: parse_or(get("MAX_BODY_BYTES"), "MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)?,
            publisher: PublisherConfig {
                destination_id: destination_id.trim().to_string(),
                endpoint_override: get("BUS_ENDPOINT_URL"),
                region: region.trim().to_string(),
                publish_timeout: Duration::from_millis(publish_timeout_ms),
            },
            retry: RetryConfig::with_max_attempts(max_attempts),
        })
    }
}

fn parse_or<T>(raw: Option<String>, field: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            field,
            reason: format!("'{value}': {e}"),
        }),
    }
}
