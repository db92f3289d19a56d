use actix_web::{web, HttpResponse, ResponseError};
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Instant;

use super::errors::IngestError;
use crate::config::DEFAULT_MAX_BODY_BYTES;
use crate::domain::order::{validate, Order, OrderEvent, ValidationError};
use crate::messaging::{MessageId, PublishError, Publisher};
use crate::metrics::Metrics;
use crate::utils::{retry_on_transient, RetryConfig};

// ============================================================================
// Ingestion Handler
// ============================================================================
//
// Received → Validated → EventBuilt → Published → Responded
//
// Decode and validation failures stop before the publisher is touched (400).
// Publish failures after the event is built answer 500. Nothing is kept
// between requests.
//
// ============================================================================

pub struct IngestionHandler {
    publisher: Arc<Publisher>,
    metrics: Arc<Metrics>,
    retry: RetryConfig,
    max_body_bytes: usize,
}

impl IngestionHandler {
    pub fn new(publisher: Arc<Publisher>, metrics: Arc<Metrics>, retry: RetryConfig) -> Self {
        Self {
            publisher,
            metrics,
            retry,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Largest request body `POST /orders` reads before answering 413.
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Turn a raw request body into an HTTP response.
    pub async fn handle(&self, body: &[u8]) -> HttpResponse {
        let result = self.ingest(body).await;
        self.respond(result)
    }

    fn respond(&self, result: Result<Order, IngestError>) -> HttpResponse {
        match result {
            Ok(order) => {
                self.metrics.record_outcome("created");
                HttpResponse::Created().json(order)
            }
            Err(err) => {
                self.metrics.record_outcome(err.outcome());
                err.error_response()
            }
        }
    }

    /// Validate, build and publish. Returns the order as received so it can be
    /// echoed back; the envelope is never exposed to the client.
    pub async fn ingest(&self, body: &[u8]) -> Result<Order, IngestError> {
        let order = Order::from_slice(body)
            .map_err(ValidationError::from)
            .and_then(|order| validate(&order).map(|()| order))
            .map_err(|err| {
                tracing::warn!(kind = err.kind(), error = %err, "Order rejected");
                err
            })?;

        let event = OrderEvent::build(order.clone());

        match self.publish(&event).await {
            Ok(message_id) => {
                tracing::info!(
                    order_id = %order.order_id,
                    customer_id = %order.customer_id,
                    items = order.items.len(),
                    message_id = %message_id,
                    "Order published"
                );
                Ok(order)
            }
            Err(err) => {
                match &err {
                    PublishError::Serialization(_) => tracing::error!(
                        order_id = %order.order_id,
                        error = %err,
                        "Order event could not be serialized"
                    ),
                    PublishError::Transport(_) => tracing::error!(
                        order_id = %order.order_id,
                        topic = %self.publisher.destination(),
                        kind = err.kind(),
                        error = %err,
                        "Failed to publish order event"
                    ),
                }
                Err(err.into())
            }
        }
    }

    async fn publish(&self, event: &OrderEvent) -> Result<MessageId, PublishError> {
        retry_on_transient(&self.retry, |attempt| async move {
            if attempt > 1 {
                self.metrics.record_retry();
            }

            let started = Instant::now();
            let result = self.publisher.publish(event).await;
            self.metrics
                .record_publish(started.elapsed().as_secs_f64(), result.as_ref().err().map(PublishError::kind));
            result
        })
        .await
        .into_result()
    }
}

/// Register the order routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/orders", web::post().to(create_order));
}

async fn create_order(handler: web::Data<IngestionHandler>, payload: web::Payload) -> HttpResponse {
    match read_body(payload, handler.max_body_bytes()).await {
        Ok(body) => handler.handle(&body).await,
        Err(err) => {
            tracing::warn!(kind = err.kind(), error = %err, "Order rejected");
            handler.respond(Err(err.into()))
        }
    }
}

/// Collect the request body, stopping as soon as it grows past `limit`.
async fn read_body(mut payload: web::Payload, limit: usize) -> Result<web::BytesMut, ValidationError> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| ValidationError::MalformedBody(e.to_string()))?;
        if body.len() + chunk.len() > limit {
            return Err(ValidationError::BodyTooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
