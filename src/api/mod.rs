// ============================================================================
// HTTP API
// ============================================================================
//
// POST /orders → IngestionHandler. Everything framework-specific stays in
// this module; the handler itself only needs the raw request body.
//
// ============================================================================

mod errors;
mod handlers;

pub use errors::{IngestError, GENERIC_FAILURE_MESSAGE};
pub use handlers::{configure, IngestionHandler};
