use std::time::Duration;

use crate::utils::IsTransient;

// ============================================================================
// Publish Errors
// ============================================================================
//
// None of these messages are meant for HTTP clients; they may contain broker
// addresses or bus error codes.
//

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    /// Deadline elapsed before the bus answered. The message may or may not
    /// have been delivered.
    #[error("publish timed out after {0:?}")]
    Timeout(Duration),

    /// The message was never handed to the bus (local queue full, circuit open).
    #[error("message bus unavailable: {0}")]
    Unavailable(String),

    /// The bus refused the message (unknown topic, authorization, size).
    #[error("message rejected by bus: {0}")]
    Rejected(String),

    /// Any other failure; delivery state unknown.
    #[error("publish failed: {0}")]
    Failed(String),
}

impl TransportError {
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Timeout(_) => "timeout",
            TransportError::Unavailable(_) => "unavailable",
            TransportError::Rejected(_) => "rejected",
            TransportError::Failed(_) => "failed",
        }
    }
}

impl IsTransient for TransportError {
    /// Only failures that provably did not reach the bus.
    fn is_transient(&self) -> bool {
        matches!(self, TransportError::Unavailable(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl PublishError {
    pub fn kind(&self) -> &'static str {
        match self {
            PublishError::Serialization(_) => "serialization",
            PublishError::Transport(err) => err.kind(),
        }
    }
}

impl IsTransient for PublishError {
    fn is_transient(&self) -> bool {
        match self {
            PublishError::Serialization(_) => false,
            PublishError::Transport(err) => err.is_transient(),
        }
    }
}
