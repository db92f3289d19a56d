use actix_web::{http::StatusCode, test, web, App};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use order_ingest::api::{self, IngestionHandler};
use order_ingest::domain::order::{EventType, OrderEvent};
use order_ingest::messaging::{InMemoryBus, Publisher, TransportError};
use order_ingest::metrics::Metrics;
use order_ingest::utils::RetryConfig;

fn ingestion_handler(bus: Arc<InMemoryBus>) -> IngestionHandler {
    let publisher = Publisher::new(bus, "order-events", Duration::from_millis(500)).unwrap();
    let metrics = Arc::new(Metrics::new().unwrap());
    IngestionHandler::new(Arc::new(publisher), metrics, RetryConfig::default())
}

fn handler(bus: Arc<InMemoryBus>) -> web::Data<IngestionHandler> {
    web::Data::new(ingestion_handler(bus))
}

fn post_orders(body: impl Into<web::Bytes>) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/orders")
        .insert_header(("content-type", "application/json"))
        .set_payload(body.into())
}

macro_rules! app {
    ($bus:expr) => {
        test::init_service(App::new().app_data(handler($bus)).configure(api::configure)).await
    };
}

#[actix_web::test]
async fn create_order_publishes_order_created_event() {
    let bus = Arc::new(InMemoryBus::new());
    let app = app!(bus.clone());

    let order = json!({
        "orderId": "o1",
        "customerId": "c1",
        "items": [{ "productId": "p1", "quantity": 2, "price": 29.99 }]
    });

    let resp = test::call_service(&app, post_orders(order.to_string()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, order);

    let messages = bus.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].destination, "order-events");

    let event = OrderEvent::from_json(&messages[0].message.payload).unwrap();
    assert_eq!(event.event_type, EventType::OrderCreated);
    assert_eq!(event.order_id, "o1");
    assert_eq!(event.customer_id, "c1");
    assert_eq!(event.items.len(), 1);
    assert_eq!(event.items[0].price, 29.99);
}

#[actix_web::test]
async fn orders_with_many_items_round_trip_unchanged() {
    let bus = Arc::new(InMemoryBus::new());
    let app = app!(bus.clone());

    let order = json!({
        "orderId": "order-42",
        "customerId": "customer-7",
        "items": [
            { "productId": "b", "quantity": 1, "price": 0.0 },
            { "productId": "a", "quantity": 10, "price": 1234.5 },
            { "productId": "c", "quantity": 3, "price": 0.01 }
        ]
    });

    let resp = test::call_service(&app, post_orders(order.to_string()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, order);

    let published: Value = serde_json::from_str(&bus.messages().await[0].message.payload).unwrap();
    assert_eq!(published["items"], order["items"]);
}

#[actix_web::test]
async fn empty_items_are_accepted() {
    let bus = Arc::new(InMemoryBus::new());
    let app = app!(bus.clone());

    let order = json!({ "orderId": "o1", "customerId": "c1", "items": [] });
    let resp = test::call_service(&app, post_orders(order.to_string()).to_request()).await;

    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(bus.messages().await.len(), 1);
}

#[actix_web::test]
async fn missing_identifiers_are_rejected_without_publishing() {
    let bus = Arc::new(InMemoryBus::new());
    let app = app!(bus.clone());

    let bodies = [
        json!({ "customerId": "c1", "items": [] }),
        json!({ "orderId": "o1", "items": [] }),
        json!({ "orderId": "", "customerId": "c1", "items": [] }),
        json!({ "orderId": "o1", "customerId": "   ", "items": [] }),
    ];

    for body in bodies {
        let resp = test::call_service(&app, post_orders(body.to_string()).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {body}");
        let error: Value = test::read_body_json(resp).await;
        assert!(error["error"].is_string());
    }

    assert_eq!(bus.send_calls(), 0);
}

#[actix_web::test]
async fn invalid_items_name_the_failing_field() {
    let bus = Arc::new(InMemoryBus::new());
    let app = app!(bus.clone());

    let order = json!({
        "orderId": "o1",
        "customerId": "c1",
        "items": [
            { "productId": "p1", "quantity": 1, "price": 1.0 },
            { "productId": "p2", "quantity": -1, "price": 1.0 }
        ]
    });

    let resp = test::call_service(&app, post_orders(order.to_string()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let error: Value = test::read_body_json(resp).await;
    assert_eq!(error["error"], "items[1].quantity must be at least 1, got -1");
    assert_eq!(bus.send_calls(), 0);
}

#[actix_web::test]
async fn empty_body_is_a_bad_request() {
    let bus = Arc::new(InMemoryBus::new());
    let app = app!(bus.clone());

    let resp = test::call_service(&app, post_orders("").to_request()).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let error: Value = test::read_body_json(resp).await;
    assert!(error.get("error").is_some());
    assert_eq!(bus.send_calls(), 0);
}

#[actix_web::test]
async fn oversized_body_gets_json_error_without_publishing() {
    let bus = Arc::new(InMemoryBus::new());
    let limited = web::Data::new(ingestion_handler(bus.clone()).with_max_body_bytes(64));
    let app = test::init_service(App::new().app_data(limited).configure(api::configure)).await;

    let order = json!({
        "orderId": "o1",
        "customerId": "c1",
        "items": [
            { "productId": "p1", "quantity": 2, "price": 29.99 },
            { "productId": "p2", "quantity": 1, "price": 5.0 },
            { "productId": "p3", "quantity": 7, "price": 0.5 }
        ]
    });
    let body = order.to_string();
    assert!(body.len() > 64);

    let resp = test::call_service(&app, post_orders(body).to_request()).await;

    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let error: Value = test::read_body_json(resp).await;
    assert_eq!(error, json!({ "error": "request body exceeds 64 bytes" }));
    assert_eq!(bus.send_calls(), 0);
}

#[actix_web::test]
async fn bus_failure_returns_opaque_server_error() {
    let bus = Arc::new(
        InMemoryBus::new().failing_with(TransportError::Failed("broker kafka-0:9092 credentials expired".into())),
    );
    let app = app!(bus.clone());

    let order = json!({ "orderId": "o1", "customerId": "c1", "items": [] });
    let resp = test::call_service(&app, post_orders(order.to_string()).to_request()).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = test::read_body(resp).await;
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(!text.contains("kafka"));
    assert!(!text.contains("credentials"));
    assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!({ "error": "Failed to process order" }));
}

#[actix_web::test]
async fn only_post_is_routed() {
    let bus = Arc::new(InMemoryBus::new());
    let app = app!(bus);

    let req = test::TestRequest::get().uri("/orders").to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_client_error());
}
