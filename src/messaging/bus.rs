use async_trait::async_trait;
use std::collections::BTreeMap;

use super::errors::TransportError;

/// Identifier the bus assigns to an accepted message. Opaque to callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single message ready for transmission.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    /// Partitioning key
    pub key: String,
    /// Serialized event, sent verbatim as the message body
    pub payload: String,
    /// Delivery metadata (message headers / attributes)
    pub attributes: BTreeMap<String, String>,
}

/// "Send one message to a destination."
///
/// Implementations must be safe to share across concurrent requests without
/// external locking, and must perform exactly one transmission per call.
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn send(&self, destination: &str, message: OutboundMessage) -> Result<MessageId, TransportError>;
}
