//! Metrics and observability utilities
//!
//! Prometheus-style metrics through the `metrics` facade. The exporter is
//! installed by the binary; these helpers only describe and record.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all R-kive metrics
pub const METRICS_PREFIX: &str = "rkive";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_related_passes_total", METRICS_PREFIX),
        Unit::Count,
        "Related-paper ranking passes"
    );

    describe_histogram!(
        format!("{}_related_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Time to fetch, score and rank candidates"
    );

    describe_histogram!(
        format!("{}_related_candidates", METRICS_PREFIX),
        Unit::Count,
        "Candidates scored per ranking pass"
    );

    describe_histogram!(
        format!("{}_related_results", METRICS_PREFIX),
        Unit::Count,
        "Related papers returned per ranking pass"
    );

    describe_counter!(
        format!("{}_candidate_fetch_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Candidate fetches that failed and yielded an empty ranking"
    );

    describe_counter!(
        format!("{}_citation_writes_total", METRICS_PREFIX),
        Unit::Count,
        "Citation edges created or deleted"
    );

    describe_counter!(
        format!("{}_events_published_total", METRICS_PREFIX),
        Unit::Count,
        "Table change events published"
    );

    describe_gauge!(
        format!("{}_event_subscriptions", METRICS_PREFIX),
        Unit::Count,
        "Live realtime subscriptions"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record one related-paper ranking pass
pub fn record_related_pass(duration_secs: f64, candidates: usize, results: usize) {
    counter!(format!("{}_related_passes_total", METRICS_PREFIX)).increment(1);
    histogram!(format!("{}_related_duration_seconds", METRICS_PREFIX)).record(duration_secs);
    histogram!(format!("{}_related_candidates", METRICS_PREFIX)).record(candidates as f64);
    histogram!(format!("{}_related_results", METRICS_PREFIX)).record(results as f64);
}

pub fn record_candidate_fetch_failure() {
    counter!(format!("{}_candidate_fetch_failures_total", METRICS_PREFIX)).increment(1);
}

/// `action` is "create" or "delete"
pub fn record_citation_write(action: &str) {
    counter!(
        format!("{}_citation_writes_total", METRICS_PREFIX),
        "action" => action.to_string()
    )
    .increment(1);
}

pub fn record_event_published(table: &str) {
    counter!(
        format!("{}_events_published_total", METRICS_PREFIX),
        "table" => table.to_string()
    )
    .increment(1);
}

pub fn set_live_subscriptions(count: usize) {
    gauge!(format!("{}_event_subscriptions", METRICS_PREFIX)).set(count as f64);
}
