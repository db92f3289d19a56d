// ============================================================================
// Order Domain
// ============================================================================
//
// - Value objects (Order, OrderItem) as received over HTTP
// - Structural validation and its error type
// - The OrderCreated event envelope and its builder
//
// ============================================================================

pub mod value_objects;
pub mod validation;
pub mod errors;
pub mod events;

pub use value_objects::*;
pub use validation::validate;
pub use errors::*;
pub use events::*;
