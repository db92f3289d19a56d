// ============================================================================
// Messaging - publishing events to the bus
// ============================================================================
//
// - bus        - the `MessageBus` capability the publisher depends on
// - kafka      - librdkafka-backed implementation (Kafka / Redpanda)
// - memory     - in-memory recording implementation for tests and local runs
// - publisher  - envelope serialization and classified publish errors
//
// ============================================================================

mod bus;
mod errors;
mod kafka;
mod memory;
mod publisher;

pub use bus::{MessageBus, MessageId, OutboundMessage};
pub use errors::{PublishError, TransportError};
pub use kafka::KafkaBus;
pub use memory::{InMemoryBus, RecordedMessage};
pub use publisher::{Publisher, PublisherConfig, DEFAULT_BROKERS};
