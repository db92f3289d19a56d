use serde::{Deserialize, Serialize};

use super::value_objects::{Order, OrderItem};

// ============================================================================
// Order Events - what the message bus carries
// ============================================================================

/// Common metadata every published event exposes to the bus layer.
///
/// The values end up in message attributes, not in the serialized body.
pub trait DomainEvent: Serialize + Send + Sync {
    fn event_type(&self) -> EventType;

    fn event_version(&self) -> u32 {
        1
    }

    /// Partition key; keeps every event for one aggregate on one partition.
    fn partition_key(&self) -> &str;

    /// Message body as published.
    fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Type tag consumers dispatch on.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventType {
    OrderCreated,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::OrderCreated => "OrderCreated",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OrderCreated envelope. Business fields are a verbatim copy of the
/// validated order; only `event_type` is synthesized.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    pub event_type: EventType,
    pub order_id: String,
    pub customer_id: String,
    pub items: Vec<OrderItem>,
}

impl OrderEvent {
    /// Build the envelope for an order that already passed validation.
    pub fn build(order: Order) -> Self {
        let Order {
            order_id,
            customer_id,
            items,
        } = order;

        Self {
            event_type: EventType::OrderCreated,
            order_id,
            customer_id,
            items,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> EventType {
        self.event_type
    }

    fn partition_key(&self) -> &str {
        &self.order_id
    }
}

// ============================================================================
// Tests
// ============================================================================
