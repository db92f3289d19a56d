use async_trait::async_trait;
use prometheus::IntGauge;
use rdkafka::{
    config::ClientConfig,
    error::{KafkaError, RDKafkaErrorCode},
    message::{Header, OwnedHeaders},
    producer::{FutureProducer, FutureRecord},
    util::Timeout,
};
use std::time::Duration;
use uuid::Uuid;

use super::bus::{MessageBus, MessageId, OutboundMessage};
use super::errors::TransportError;
use crate::utils::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};

pub const MESSAGE_ID_HEADER: &str = "message-id";
const CLIENT_ID: &str = "order-ingest";

/// Kafka / Redpanda producer behind a circuit breaker.
///
/// `FutureProducer` is internally pooled and thread-safe, so a single
/// instance is shared by every request.
///
/// `delivery_timeout` bounds each send inside the breaker, so a hung broker
/// counts towards opening it. It must be shorter than any deadline the caller
/// wraps around [`MessageBus::send`].
pub struct KafkaBus {
    producer: FutureProducer,
    circuit_breaker: CircuitBreaker,
    delivery_timeout: Duration,
}

impl KafkaBus {
    /// Build the producer. This validates client configuration only; brokers
    /// are contacted lazily.
    pub fn new(brokers: &str, region: &str, delivery_timeout: Duration) -> Result<Self, KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("client.id", CLIENT_ID)
            .set("client.rack", region)
            .set("acks", "all")
            .set("enable.idempotence", "true")
            .set("message.timeout.ms", delivery_timeout.as_millis().to_string())
            .create()?;

        let cb_config = CircuitBreakerConfig {
            failure_threshold: 5,
            cool_down: Duration::from_secs(30),
            success_threshold: 2,
        };

        Ok(Self {
            producer,
            circuit_breaker: CircuitBreaker::new(cb_config),
            delivery_timeout,
        })
    }

    /// Report breaker transitions on `gauge`.
    pub fn with_state_gauge(mut self, gauge: IntGauge) -> Self {
        self.circuit_breaker = self.circuit_breaker.with_state_gauge(gauge);
        self
    }

    fn classify(&self, err: KafkaError) -> TransportError {
        match err.rdkafka_error_code() {
            Some(RDKafkaErrorCode::QueueFull) => TransportError::Unavailable(err.to_string()),
            Some(RDKafkaErrorCode::MessageTimedOut) => TransportError::Timeout(self.delivery_timeout),
            Some(
                RDKafkaErrorCode::UnknownTopic
                | RDKafkaErrorCode::UnknownTopicOrPartition
                | RDKafkaErrorCode::TopicAuthorizationFailed
                | RDKafkaErrorCode::ClusterAuthorizationFailed
                | RDKafkaErrorCode::MessageSizeTooLarge,
            ) => TransportError::Rejected(err.to_string()),
            _ => TransportError::Failed(err.to_string()),
        }
    }
}

#[async_trait]
impl MessageBus for KafkaBus {
    async fn send(&self, destination: &str, message: OutboundMessage) -> Result<MessageId, TransportError> {
        let message_id = MessageId::new(Uuid::now_v7().to_string());

        let mut headers = OwnedHeaders::new().insert(Header {
            key: MESSAGE_ID_HEADER,
            value: Some(message_id.as_str()),
        });
        for (key, value) in &message.attributes {
            headers = headers.insert(Header {
                key: key.as_str(),
                value: Some(value.as_str()),
            });
        }

        let result = self
            .circuit_breaker
            .call_with_deadline(self.delivery_timeout, async {
                let record = FutureRecord::to(destination)
                    .key(message.key.as_str())
                    .payload(message.payload.as_str())
                    .headers(headers);

                self.producer
                    .send(record, Timeout::After(self.delivery_timeout))
                    .await
                    .map_err(|(err, _)| self.classify(err))
            })
            .await;

        match result {
            Ok(_) => {
                tracing::debug!(
                    topic = %destination,
                    key = %message.key,
                    message_id = %message_id,
                    "Delivered to Kafka"
                );
                Ok(message_id)
            }
            Err(CircuitBreakerError::Open) => {
                tracing::error!(topic = %destination, "Circuit breaker open - Kafka unavailable");
                Err(TransportError::Unavailable("circuit breaker open".to_string()))
            }
            Err(CircuitBreakerError::DeadlineElapsed(after)) => {
                tracing::error!(
                    topic = %destination,
                    key = %message.key,
                    timeout_ms = after.as_millis() as u64,
                    "Kafka did not acknowledge in time"
                );
                Err(TransportError::Timeout(after))
            }
            Err(CircuitBreakerError::Inner(err)) => {
                tracing::error!(
                    error = %err,
                    topic = %destination,
                    key = %message.key,
                    "Failed to publish to Kafka"
                );
                Err(err)
            }
        }
    }
}
