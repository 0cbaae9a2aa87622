use std::time::Duration;

use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};

use crate::board::StatusCounts;
use crate::models::delivery::DeliveryStatus;

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub gateway_calls_total: IntCounterVec,
    pub gateway_latency_seconds: HistogramVec,
    pub polls_total: IntCounterVec,
    pub deliveries: IntGaugeVec,
    pub new_delivery_alerts_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let gateway_calls_total = IntCounterVec::new(
            Opts::new("gateway_calls_total", "Backend calls by operation and outcome"),
            &["operation", "outcome"],
        )
        .expect("valid gateway_calls_total metric");

        let gateway_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "gateway_latency_seconds",
                "Latency of backend calls in seconds",
            ),
            &["operation"],
        )
        .expect("valid gateway_latency_seconds metric");

        let polls_total = IntCounterVec::new(
            Opts::new("polls_total", "Delivery board refreshes by outcome"),
            &["outcome"],
        )
        .expect("valid polls_total metric");

        let deliveries = IntGaugeVec::new(
            Opts::new("deliveries", "Deliveries on the board by status"),
            &["status"],
        )
        .expect("valid deliveries metric");

        let new_delivery_alerts_total = IntCounter::new(
            "new_delivery_alerts_total",
            "Number of times the new-delivery alert was raised",
        )
        .expect("valid new_delivery_alerts_total metric");

        registry
            .register(Box::new(gateway_calls_total.clone()))
            .expect("register gateway_calls_total");
        registry
            .register(Box::new(gateway_latency_seconds.clone()))
            .expect("register gateway_latency_seconds");
        registry
            .register(Box::new(polls_total.clone()))
            .expect("register polls_total");
        registry
            .register(Box::new(deliveries.clone()))
            .expect("register deliveries");
        registry
            .register(Box::new(new_delivery_alerts_total.clone()))
            .expect("register new_delivery_alerts_total");

        Self {
            registry,
            gateway_calls_total,
            gateway_latency_seconds,
            polls_total,
            deliveries,
            new_delivery_alerts_total,
        }
    }

    pub fn observe_gateway_call(&self, operation: &str, outcome: &str, elapsed: Duration) {
        self.gateway_calls_total
            .with_label_values(&[operation, outcome])
            .inc();
        self.gateway_latency_seconds
            .with_label_values(&[operation])
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_counts(&self, counts: &StatusCounts) {
        for status in DeliveryStatus::ALL {
            self.deliveries
                .with_label_values(&[status.as_str()])
                .set(counts.get(status) as i64);
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
