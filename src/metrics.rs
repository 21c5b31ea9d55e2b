use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    HistogramVec, IntCounter, IntCounterVec, IntGauge,
};

lazy_static! {
    // Request metrics
    pub static ref REQUESTS_RECEIVED_TOTAL: IntCounter = register_int_counter!(
        "greenlight_requests_received_total",
        "Total number of HTTP requests received"
    ).unwrap();

    pub static ref RESPONSES_SENT_TOTAL: IntCounterVec = register_int_counter_vec!(
        "greenlight_responses_sent_total",
        "Total number of HTTP responses sent",
        &["status"]
    ).unwrap();

    pub static ref REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "greenlight_request_duration_seconds",
        "Request processing duration in seconds",
        &["status"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    ).unwrap();

    // Limiter metrics
    pub static ref LIMITER_DECISIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "greenlight_limiter_decisions_total",
        "Rate limiter decisions",
        &["allowed"]
    ).unwrap();

    pub static ref LIMITER_TRACKED_CLIENTS: IntGauge = register_int_gauge!(
        "greenlight_limiter_tracked_clients",
        "Clients tracked by the limiter after the last sweep"
    ).unwrap();

    pub static ref LIMITER_EVICTIONS_TOTAL: IntCounter = register_int_counter!(
        "greenlight_limiter_evictions_total",
        "Idle limiter entries evicted by the sweeper"
    ).unwrap();

    // Storage metrics
    pub static ref STORE_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "greenlight_store_operations_total",
        "Storage operations by outcome",
        &["operation", "outcome"]
    ).unwrap();

    // Config metrics
    pub static ref CONFIG_RELOADS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "greenlight_config_reloads_total",
        "Total number of configuration reloads",
        &["result"]
    ).unwrap();
}

/// Record a completed HTTP request
pub fn record_response(status: u16, duration_secs: f64) {
    let status = status.to_string();
    RESPONSES_SENT_TOTAL.with_label_values(&[&status]).inc();
    REQUEST_DURATION
        .with_label_values(&[&status])
        .observe(duration_secs);
}

pub fn record_request_received() {
    REQUESTS_RECEIVED_TOTAL.inc();
}

pub fn record_limiter_decision(allowed: bool) {
    let allowed = if allowed { "true" } else { "false" };
    LIMITER_DECISIONS_TOTAL.with_label_values(&[allowed]).inc();
}

/// Record the result of one sweep pass
pub fn record_sweep(evicted: usize, remaining: usize) {
    LIMITER_EVICTIONS_TOTAL.inc_by(evicted as u64);
    LIMITER_TRACKED_CLIENTS.set(remaining as i64);
}

pub fn record_store_operation(operation: &str, outcome: &str) {
    STORE_OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

/// Record config reload
pub fn record_config_reload(success: bool) {
    let result = if success { "success" } else { "error" };
    CONFIG_RELOADS_TOTAL.with_label_values(&[result]).inc();
}

/// Render every registered metric in the text exposition format
pub fn gather_metrics() -> Result<String, String> {
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {}", e))?;

    String::from_utf8(buffer).map_err(|e| format!("Failed to convert metrics to UTF-8: {}", e))
}
