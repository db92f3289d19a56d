// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for order intake
// ============================================================================
//
// - Requests by outcome (created / rejected / failed)
// - Publish latency and failures by transport kind
// - Publish retries
// - Bus circuit breaker state
//
// Scraped from the separate metrics server at /metrics.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub orders_received: IntCounterVec,
    pub publish_duration: HistogramVec,
    pub publish_failures: IntCounterVec,
    pub publish_retries: IntCounter,
    pub circuit_breaker_state: IntGauge,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let orders_received = IntCounterVec::new(
            Opts::new("orders_received_total", "Order requests handled, by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(orders_received.clone()))?;

        let publish_duration = HistogramVec::new(
            HistogramOpts::new("order_publish_duration_seconds", "Time spent publishing one order event")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["outcome"],
        )?;
        registry.register(Box::new(publish_duration.clone()))?;

        let publish_failures = IntCounterVec::new(
            Opts::new("order_publish_failures_total", "Failed publish attempts, by error kind"),
            &["kind"],
        )?;
        registry.register(Box::new(publish_failures.clone()))?;

        let publish_retries = IntCounter::new(
            "order_publish_retries_total",
            "Publish attempts beyond the first",
        )?;
        registry.register(Box::new(publish_retries.clone()))?;

        let circuit_breaker_state = IntGauge::new(
            "circuit_breaker_state",
            "Bus circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
        )?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        Ok(Self {
            registry,
            orders_received,
            publish_duration,
            publish_failures,
            publish_retries,
            circuit_breaker_state,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_outcome(&self, outcome: &str) {
        self.orders_received.with_label_values(&[outcome]).inc();
    }

    /// One publish attempt. `failure_kind` is `None` on success.
    pub fn record_publish(&self, duration_secs: f64, failure_kind: Option<&str>) {
        let outcome = if failure_kind.is_some() { "error" } else { "ok" };
        self.publish_duration.with_label_values(&[outcome]).observe(duration_secs);
        if let Some(kind) = failure_kind {
            self.publish_failures.with_label_values(&[kind]).inc();
        }
    }

    pub fn record_retry(&self) {
        self.publish_retries.inc();
    }
}
