//! Prometheus metrics setup and metric definitions

use anyhow::{Context, Result};
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const AUTH_DECISIONS: &str = "carstore_auth_decisions_total";
pub const ORDER_EVENTS_PUBLISHED: &str = "carstore_order_events_published_total";
pub const STOCK_EVENTS: &str = "carstore_stock_events_total";

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

/// Register metric descriptions and emit initial zero values so Prometheus output
/// includes HELP/TYPE lines for all metrics from startup (not just after first use).
pub fn describe_metrics() {
    describe_counter!(
        AUTH_DECISIONS,
        "Authorization gate decisions by method and result"
    );
    describe_counter!(
        ORDER_EVENTS_PUBLISHED,
        "Stock decrement events published on order creation"
    );
    describe_counter!(
        STOCK_EVENTS,
        "Stock decrement events processed by outcome"
    );

    for result in ["published", "failed"] {
        counter!(ORDER_EVENTS_PUBLISHED, "result" => result).absolute(0);
    }
    for result in [
        "applied",
        "malformed",
        "not_found",
        "insufficient_stock",
        "rejected",
        "retry",
    ] {
        counter!(STOCK_EVENTS, "result" => result).absolute(0);
    }
}

pub fn record_auth_decision(method: &str, result: &'static str) {
    counter!(AUTH_DECISIONS, "method" => method.to_string(), "result" => result).increment(1);
}

pub fn record_order_event_published(result: &'static str) {
    counter!(ORDER_EVENTS_PUBLISHED, "result" => result).increment(1);
}

pub fn record_stock_event(result: &'static str) {
    counter!(STOCK_EVENTS, "result" => result).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        // No global recorder installed in unit tests; the facade discards.
        describe_metrics();
        record_auth_decision("/order.OrderService/CreateOrder", "allowed");
        record_order_event_published("published");
        record_stock_event("applied");
    }
}
