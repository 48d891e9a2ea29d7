//! Service metrics
//!
//! Counters and histograms for the ingestion and rollup paths. Without an
//! installed recorder every call is a no-op, so tests and one-shot CLI runs
//! need no setup.

use std::net::SocketAddr;
use std::sync::Once;
use tracing::{info, warn};

static INIT: Once = Once::new();

/// Prefix every metric with `rollup_` and counters with a `_total` suffix
macro_rules! rollup_metric {
    (counter, $name:literal) => {
        concat!("rollup_", $name, "_total")
    };
    (histogram, $name:literal) => {
        concat!("rollup_", $name)
    };
}

pub const READINGS_INGESTED: &str = rollup_metric!(counter, "readings_ingested");
pub const VALIDATION_FAILURES: &str = rollup_metric!(counter, "validation_failures");
pub const AGGREGATIONS_WRITTEN: &str = rollup_metric!(counter, "aggregations_written");
pub const AGGREGATIONS_SKIPPED: &str = rollup_metric!(counter, "aggregations_skipped");
pub const AGGREGATION_READINGS: &str = rollup_metric!(histogram, "aggregation_readings");

/// Documentation for a single metric
#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub help: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Histogram,
}

pub fn metrics_documentation() -> Vec<MetricDoc> {
    vec![
        MetricDoc {
            name: READINGS_INGESTED,
            metric_type: MetricType::Counter,
            help: "Readings stored by the ingestion endpoint",
        },
        MetricDoc {
            name: VALIDATION_FAILURES,
            metric_type: MetricType::Counter,
            help: "Requests rejected by validation, labeled by entrypoint",
        },
        MetricDoc {
            name: AGGREGATIONS_WRITTEN,
            metric_type: MetricType::Counter,
            help: "Aggregate records written by the rollup job",
        },
        MetricDoc {
            name: AGGREGATIONS_SKIPPED,
            metric_type: MetricType::Counter,
            help: "Rollup runs that found no readings and wrote nothing",
        },
        MetricDoc {
            name: AGGREGATION_READINGS,
            metric_type: MetricType::Histogram,
            help: "Readings folded into each rollup run",
        },
    ]
}

/// Install the Prometheus exporter on `addr`. Idempotent.
pub fn init_metrics(addr: SocketAddr) {
    INIT.call_once(|| {
        match metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
        {
            Ok(()) => {
                for doc in metrics_documentation() {
                    match doc.metric_type {
                        MetricType::Counter => ::metrics::describe_counter!(doc.name, doc.help),
                        MetricType::Histogram => ::metrics::describe_histogram!(doc.name, doc.help),
                    }
                }
                info!("Prometheus exporter listening on http://{}/metrics", addr);
            }
            Err(e) => warn!("Failed to install Prometheus exporter: {}", e),
        }
    });
}

pub fn reading_ingested() {
    ::metrics::counter!(READINGS_INGESTED).increment(1);
}

pub fn validation_failed(entrypoint: &'static str) {
    ::metrics::counter!(VALIDATION_FAILURES, "entrypoint" => entrypoint).increment(1);
}

pub fn aggregation_written() {
    ::metrics::counter!(AGGREGATIONS_WRITTEN).increment(1);
}

pub fn aggregation_skipped() {
    ::metrics::counter!(AGGREGATIONS_SKIPPED).increment(1);
}

pub fn aggregation_readings(count: usize) {
    ::metrics::histogram!(AGGREGATION_READINGS).record(count as f64);
}
