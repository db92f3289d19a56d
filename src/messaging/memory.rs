use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use super::bus::{MessageBus, MessageId, OutboundMessage};
use super::errors::TransportError;

/// A message accepted by [`InMemoryBus`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedMessage {
    pub destination: String,
    pub message_id: MessageId,
    pub message: OutboundMessage,
}

/// Recording bus with failure and latency injection.
#[derive(Debug, Default)]
pub struct InMemoryBus {
    delivered: Mutex<Vec<RecordedMessage>>,
    queued_failures: Mutex<VecDeque<TransportError>>,
    permanent_failure: Option<TransportError>,
    latency: Option<Duration>,
    sequence: AtomicU64,
    send_calls: AtomicU64,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send fails with `err`.
    pub fn failing_with(mut self, err: TransportError) -> Self {
        self.permanent_failure = Some(err);
        self
    }

    /// Every send waits `latency` before completing.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// The next send fails with `err`. Queued failures are consumed in order.
    pub async fn fail_next(&self, err: TransportError) {
        self.queued_failures.lock().await.push_back(err);
    }

    pub async fn messages(&self) -> Vec<RecordedMessage> {
        self.delivered.lock().await.clone()
    }

    /// Number of times `send` was entered, successful or not.
    pub fn send_calls(&self) -> u64 {
        self.send_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn send(&self, destination: &str, message: OutboundMessage) -> Result<MessageId, TransportError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(err) = self.queued_failures.lock().await.pop_front() {
            return Err(err);
        }
        if let Some(err) = &self.permanent_failure {
            return Err(err.clone());
        }

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let message_id = MessageId::new(format!("mem-{sequence}"));

        self.delivered.lock().await.push(RecordedMessage {
            destination: destination.to_string(),
            message_id: message_id.clone(),
            message,
        });

        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn message(key: &str) -> OutboundMessage {
        OutboundMessage {
            key: key.to_string(),
            payload: "{}".to_string(),
            attributes: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_records_messages_with_sequential_ids() {
        let bus = InMemoryBus::new();

        let first = bus.send("orders", message("o1")).await.unwrap();
        let second = bus.send("orders", message("o2")).await.unwrap();

        assert_eq!(first.as_str(), "mem-1");
        assert_eq!(second.as_str(), "mem-2");

        let messages = bus.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].destination, "orders");
        assert_eq!(messages[1].message.key, "o2");
    }

    #[tokio::test]
    async fn test_queued_failure_applies_once() {
        let bus = InMemoryBus::new();
        bus.fail_next(TransportError::Unavailable("queue full".into())).await;

        assert!(bus.send("orders", message("o1")).await.is_err());
        assert!(bus.send("orders", message("o1")).await.is_ok());
        assert_eq!(bus.send_calls(), 2);
        assert_eq!(bus.messages().await.len(), 1);
    }

    #[tokio::test]
    async fn test_permanent_failure_records_nothing() {
        let bus = InMemoryBus::new().failing_with(TransportError::Rejected("unknown topic".into()));

        let err = bus.send("orders", message("o1")).await.unwrap_err();
        assert_eq!(err.kind(), "rejected");
        assert!(bus.messages().await.is_empty());
    }
}
