use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use super::bus::{MessageBus, MessageId, OutboundMessage};
use super::errors::{PublishError, TransportError};
use super::kafka::KafkaBus;
use crate::config::ConfigError;
use crate::domain::order::DomainEvent;
use crate::metrics::Metrics;

/// Brokers used when no endpoint override is configured.
pub const DEFAULT_BROKERS: &str = "127.0.0.1:9092";

/// Deadline handed to the bus client for one send.
///
/// It expires before the publish deadline so the client reports the timeout
/// itself instead of being dropped mid-call.
fn delivery_timeout(publish_timeout: Duration) -> Duration {
    let margin = (publish_timeout / 10).clamp(Duration::from_millis(1), Duration::from_millis(500));
    publish_timeout
        .saturating_sub(margin)
        .max(Duration::from_millis(1))
}

/// Connection settings for the publisher, fixed at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct PublisherConfig {
    /// Topic every event is published to
    pub destination_id: String,
    /// Broker list replacing [`DEFAULT_BROKERS`] (local or staging buses)
    pub endpoint_override: Option<String>,
    /// Region / rack identifier reported by the client
    pub region: String,
    /// Deadline for a single publish call
    pub publish_timeout: Duration,
}

/// Serializes events and hands them to the bus, one call per publish.
///
/// Cheap to share: every request holds the same instance behind an `Arc`.
pub struct Publisher {
    bus: Arc<dyn MessageBus>,
    destination: String,
    publish_timeout: Duration,
}

impl Publisher {
    /// Build a publisher backed by Kafka. The bus circuit breaker reports
    /// its state on `metrics`.
    pub fn create(config: &PublisherConfig, metrics: &Metrics) -> Result<Self, ConfigError> {
        require_non_empty("ORDERS_TOPIC", &config.destination_id)?;
        require_non_empty("BUS_REGION", &config.region)?;

        let brokers = match &config.endpoint_override {
            Some(endpoint) => parse_endpoint(endpoint)?,
            None => DEFAULT_BROKERS.to_string(),
        };

        let bus = KafkaBus::new(&brokers, config.region.trim(), delivery_timeout(config.publish_timeout))
            .map_err(|e| ConfigError::BusClient(e.to_string()))?
            .with_state_gauge(metrics.circuit_breaker_state.clone());

        tracing::info!(
            topic = %config.destination_id,
            brokers = %brokers,
            region = %config.region,
            "Kafka publisher created"
        );

        Self::new(Arc::new(bus), &config.destination_id, config.publish_timeout)
    }

    /// Build a publisher over any bus implementation.
    pub fn new(
        bus: Arc<dyn MessageBus>,
        destination: &str,
        publish_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        require_non_empty("ORDERS_TOPIC", destination)?;

        Ok(Self {
            bus,
            destination: destination.trim().to_string(),
            publish_timeout,
        })
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Serialize `event` and send it as a single message.
    ///
    /// If the bus does not answer within the publish timeout the in-flight
    /// call is dropped and `TransportError::Timeout` is returned. Whether the
    /// message was delivered is then unknown.
    pub async fn publish<E: DomainEvent>(&self, event: &E) -> Result<MessageId, PublishError> {
        let payload = event.to_json()?;

        let mut attributes = BTreeMap::new();
        attributes.insert("event-type".to_string(), event.event_type().to_string());
        attributes.insert("event-version".to_string(), event.event_version().to_string());
        attributes.insert("content-type".to_string(), "application/json".to_string());

        let message = OutboundMessage {
            key: event.partition_key().to_string(),
            payload,
            attributes,
        };

        match tokio::time::timeout(self.publish_timeout, self.bus.send(&self.destination, message)).await {
            Ok(Ok(message_id)) => {
                tracing::debug!(
                    topic = %self.destination,
                    message_id = %message_id,
                    event_type = %event.event_type(),
                    "Event published"
                );
                Ok(message_id)
            }
            Ok(Err(err)) => Err(err.into()),
            Err(_) => {
                tracing::warn!(
                    topic = %self.destination,
                    timeout_ms = self.publish_timeout.as_millis() as u64,
                    "Publish deadline elapsed, abandoning in-flight call"
                );
                Err(TransportError::Timeout(self.publish_timeout).into())
            }
        }
    }
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingField { field });
    }
    Ok(())
}

/// Normalize `BUS_ENDPOINT_URL` into a librdkafka broker list.
///
/// Accepts comma-separated `host:port` entries, each optionally prefixed with
/// a scheme (`http://localhost:9092`). A trailing slash is ignored.
fn parse_endpoint(raw: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        field: "BUS_ENDPOINT_URL",
        reason,
    };

    let mut brokers = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        let address = entry
            .split_once("://")
            .map_or(entry, |(_, rest)| rest)
            .trim_end_matches('/');

        let (host, port) = address
            .rsplit_once(':')
            .ok_or_else(|| invalid(format!("'{entry}' is not host:port")))?;

        if host.is_empty() || host.contains('/') {
            return Err(invalid(format!("'{entry}' has no valid host")));
        }
        if port.parse::<u16>().map_or(true, |p| p == 0) {
            return Err(invalid(format!("'{entry}' has no valid port")));
        }

        brokers.push(address.to_string());
    }

    Ok(brokers.join(","))
}
