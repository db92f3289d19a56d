//! Order intake service: accepts orders over HTTP and publishes each one to
//! the message bus as an `OrderCreated` event.

pub mod api;
pub mod config;
pub mod domain;
pub mod messaging;
pub mod metrics;
pub mod utils;
