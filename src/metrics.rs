//! Metrics for the statistics pipeline
//!
//! Prometheus counters for schema loads, query outcomes and selection
//! activity, plus a text exporter.

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram_vec, Counter,
    CounterVec, Encoder, Gauge, HistogramVec, TextEncoder,
};

lazy_static! {
    // === Query Counters ===

    /// Statistics queries by outcome
    pub static ref QUERIES_TOTAL: CounterVec = register_counter_vec!(
        "fstats_queries_total",
        "Total statistics queries by outcome",
        &["status"]
    ).unwrap();

    /// Responses that arrived after a reset and were dropped
    pub static ref STALE_RESPONSES_TOTAL: Counter = register_counter!(
        "fstats_stale_responses_total",
        "Responses discarded because the session moved on"
    ).unwrap();

    /// Requests that failed validation before being sent
    pub static ref VALIDATION_FAILURES_TOTAL: CounterVec = register_counter_vec!(
        "fstats_validation_failures_total",
        "Requests rejected before being sent",
        &["reason"]
    ).unwrap();

    /// Triggers rejected while a query was outstanding
    pub static ref PENDING_REJECTIONS_TOTAL: Counter = register_counter!(
        "fstats_pending_rejections_total",
        "Query triggers rejected while another query was pending"
    ).unwrap();

    // === Selection Counters ===

    /// Duplicate statistic definitions that were ignored
    pub static ref DUPLICATE_DEFINITIONS_TOTAL: Counter = register_counter!(
        "fstats_duplicate_definitions_total",
        "Statistic definitions ignored because they already existed"
    ).unwrap();

    /// Schema loads by outcome
    pub static ref SCHEMA_LOADS_TOTAL: CounterVec = register_counter_vec!(
        "fstats_schema_loads_total",
        "Dataset schema loads by outcome",
        &["status"]
    ).unwrap();

    // === Latency ===

    /// Statistics query duration
    pub static ref QUERY_DURATION: HistogramVec = register_histogram_vec!(
        "fstats_query_duration_seconds",
        "Statistics query latency in seconds",
        &["status"],
        vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 30.0]
    ).unwrap();

    // === Result Gauges ===

    /// Groups in the current result tree
    pub static ref RESULT_RECORDS: Gauge = register_gauge!(
        "fstats_result_records",
        "Number of groups in the current result set"
    ).unwrap();
}

/// Get metrics in Prometheus text format
pub fn gather_metrics() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {}", e))?;

    String::from_utf8(buffer).map_err(|e| format!("Metrics contain invalid UTF-8: {}", e))
}

/// Record a finished query
#[inline]
pub fn record_query(status: &str, duration_secs: f64) {
    QUERIES_TOTAL.with_label_values(&[status]).inc();
    QUERY_DURATION
        .with_label_values(&[status])
        .observe(duration_secs);
}

/// Record a request rejected by validation
#[inline]
pub fn record_validation_failure(reason: &str) {
    VALIDATION_FAILURES_TOTAL.with_label_values(&[reason]).inc();
}

/// Record a schema load
#[inline]
pub fn record_schema_load(success: bool) {
    let status = if success { "success" } else { "error" };
    SCHEMA_LOADS_TOTAL.with_label_values(&[status]).inc();
}

/// Update the size of the current result set
#[inline]
pub fn update_result_records(count: usize) {
    RESULT_RECORDS.set(count as f64);
}
