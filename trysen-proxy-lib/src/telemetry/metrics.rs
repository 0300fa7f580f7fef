use opentelemetry::global;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter, UpDownCounter};
use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::Registry;
use std::sync::Arc;

use crate::admission::{Decision, IntervalSnapshot};

pub mod labels {
    pub const DECISION: &str = "decision";
    pub const REASON: &str = "reason";
    pub const ERROR_TYPE: &str = "error_type";
    pub const METHOD: &str = "method";
    pub const STATUS_CODE: &str = "status_code";
    pub const VERSION: &str = "version";
}

#[derive(Clone)]
pub struct Metrics {
    pub connections_total: Counter<u64>,
    pub connections_active: UpDownCounter<i64>,

    pub requests_total: Counter<u64>,
    pub requests_duration_seconds: Histogram<f64>,

    // Admission control
    pub admission_decisions_total: Counter<u64>,
    pub drops_total: Counter<u64>,
    pub remapped_total: Counter<u64>,
    pub interval_current_limit: Gauge<u64>,
    pub interval_accepted: Gauge<u64>,
    pub interval_dropped: Gauge<u64>,

    pub backend_errors_total: Counter<u64>,
    pub backend_duration_seconds: Histogram<f64>,

    pub tls_handshake_errors_total: Counter<u64>,

    pub build_info: Gauge<u64>,
}

impl Metrics {
    /// Build the instruments on `meter`.
    pub fn new(meter: Meter) -> Self {
        Self {
            connections_total: meter
                .u64_counter("trysen_connections_total")
                .with_description("Total number of connections established")
                .build(),
            connections_active: meter
                .i64_up_down_counter("trysen_connections_active")
                .with_description("Number of active connections")
                .build(),

            requests_total: meter
                .u64_counter("trysen_requests_total")
                .with_description("Total number of requests processed")
                .build(),
            requests_duration_seconds: meter
                .f64_histogram("trysen_requests_duration_seconds")
                .with_description("Request duration in seconds, drop hold time included")
                .build(),

            admission_decisions_total: meter
                .u64_counter("trysen_admission_decisions_total")
                .with_description("Admission decisions taken for issue submissions")
                .build(),
            drops_total: meter
                .u64_counter("trysen_drops_total")
                .with_description("Issue submissions answered with a silent drop")
                .build(),
            remapped_total: meter
                .u64_counter("trysen_remapped_total")
                .with_description("Issue submissions forwarded with remapped identifiers")
                .build(),
            interval_current_limit: meter
                .u64_gauge("trysen_interval_current_limit")
                .with_description("Per-client budget granted to new clients")
                .build(),
            interval_accepted: meter
                .u64_gauge("trysen_interval_accepted")
                .with_description("Issue submissions accepted during the last closed interval")
                .build(),
            interval_dropped: meter
                .u64_gauge("trysen_interval_dropped")
                .with_description("Issue submissions dropped during the last closed interval")
                .build(),

            backend_errors_total: meter
                .u64_counter("trysen_backend_errors_total")
                .with_description("Requests that failed to get a response from the backend")
                .build(),
            backend_duration_seconds: meter
                .f64_histogram("trysen_backend_duration_seconds")
                .with_description("Time until the backend response headers arrived")
                .build(),

            tls_handshake_errors_total: meter
                .u64_counter("trysen_tls_handshake_errors_total")
                .with_description("Failed or timed out TLS handshakes")
                .build(),

            build_info: meter
                .u64_gauge("trysen_build_info")
                .with_description("Build information")
                .build(),
        }
    }

    fn set_build_info(&self) {
        self.build_info
            .record(1, &[KeyValue::new(labels::VERSION, env!("CARGO_PKG_VERSION"))]);
    }

    pub fn record_request(&self, method: &str, status_code: u16, duration: f64) {
        let attrs = [
            KeyValue::new(labels::METHOD, method.to_string()),
            KeyValue::new(labels::STATUS_CODE, status_code.to_string()),
        ];
        self.requests_total.add(1, &attrs);
        self.requests_duration_seconds.record(duration, &attrs);
    }

    pub fn record_decision(&self, decision: Decision) {
        self.admission_decisions_total
            .add(1, &[KeyValue::new(labels::DECISION, decision.as_str())]);
    }

    pub fn record_drop(&self, reason: &'static str) {
        self.drops_total.add(1, &[KeyValue::new(labels::REASON, reason)]);
    }

    pub fn record_remap(&self) {
        self.remapped_total.add(1, &[]);
    }

    pub fn record_backend_response(&self, duration: f64) {
        self.backend_duration_seconds.record(duration, &[]);
    }

    pub fn record_backend_error(&self, error_type: &'static str) {
        self.backend_errors_total
            .add(1, &[KeyValue::new(labels::ERROR_TYPE, error_type)]);
    }

    pub fn record_interval(&self, snapshot: &IntervalSnapshot, next_limit: u64) {
        self.interval_current_limit.record(next_limit, &[]);
        self.interval_accepted.record(snapshot.count_accepted, &[]);
        self.interval_dropped.record(snapshot.count_dropped, &[]);
    }
}

/// Install a Prometheus-backed meter provider and build the proxy metrics on it.
pub fn init_metrics() -> Result<(Arc<Metrics>, Registry), Box<dyn std::error::Error + Send + Sync>>
{
    let registry = Registry::default();

    let exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()?;

    let meter_provider = SdkMeterProvider::builder().with_reader(exporter).build();

    global::set_meter_provider(meter_provider);

    let meter = global::meter("trysen-proxy");
    let metrics = Arc::new(Metrics::new(meter));

    metrics.set_build_info();

    Ok((metrics, registry))
}
