//! Prometheus Metrics Module
//!
//! Gateway-level metrics: active websocket connections, inbound event
//! counts by type, and published fan-out counts.

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Active websocket connections gauge
pub static CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new(
            "websocket_connections_active",
            "Number of active websocket connections",
        )
        .namespace("chat_gateway"),
    )
    .expect("Failed to create CONNECTIONS_ACTIVE metric")
});

/// Inbound event counter by event type and outcome
pub static EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("events_total", "Inbound websocket events").namespace("chat_gateway"),
        &["event_type", "outcome"], // outcome: "ok" | "error"
    )
    .expect("Failed to create EVENTS_TOTAL metric")
});

/// Published group events counter
pub static PUBLISHED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("published_total", "Events published to broadcast groups")
            .namespace("chat_gateway"),
        &["event_type"],
    )
    .expect("Failed to create PUBLISHED_TOTAL metric")
});

fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(EVENTS_TOTAL.clone()))
        .expect("Failed to register EVENTS_TOTAL");
    registry
        .register(Box::new(PUBLISHED_TOTAL.clone()))
        .expect("Failed to register PUBLISHED_TOTAL");
}

/// Encode all registered metrics in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
