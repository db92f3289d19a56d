// ============================================================================
// Domain Layer
// ============================================================================
//
// Order intake types and the pure rules applied to them before anything
// touches the message bus. Nothing in here performs I/O.
//
// ============================================================================

pub mod order;
