//! Recommendation Metrics
//!
//! Prometheus metrics for the request path and the model lifecycle

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec, TextEncoder,
};
use std::time::Duration;

static RECOMMENDATION_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "recommendation_requests_total",
        "Recommendation requests by outcome (hybrid/fallback/error)",
        &["outcome"]
    )
    .expect("Failed to register recommendation requests metric")
});

static CHANNEL_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "recommendation_channel_failures_total",
        "Blend channels that degraded to an empty result",
        &["channel"]
    )
    .expect("Failed to register channel failures metric")
});

static TRAINING_RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "recommendation_training_runs_total",
        "Model training runs (success/error)",
        &["status"]
    )
    .expect("Failed to register training runs metric")
});

static TRAINING_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "recommendation_training_duration_seconds",
        "Duration of full model rebuilds",
        vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0]
    )
    .expect("Failed to register training duration metric")
});

static MODEL_LOADS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "recommendation_model_loads_total",
        "Model snapshot loads from cache (hit/miss/rejected)",
        &["result"]
    )
    .expect("Failed to register model loads metric")
});

static PREFERENCE_EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "recommendation_preference_events_total",
        "User interaction events written to preference logs",
        &["action", "status"]
    )
    .expect("Failed to register preference events metric")
});

pub fn record_request(outcome: &str) {
    RECOMMENDATION_REQUESTS_TOTAL
        .with_label_values(&[outcome])
        .inc();
}

pub fn record_channel_failure(channel: &str) {
    CHANNEL_FAILURES_TOTAL.with_label_values(&[channel]).inc();
}

pub fn record_training_run(status: &str) {
    TRAINING_RUNS_TOTAL.with_label_values(&[status]).inc();
}

pub fn record_training_duration(duration: Duration) {
    TRAINING_DURATION_SECONDS.observe(duration.as_secs_f64());
}

pub fn record_model_load(result: &str) {
    MODEL_LOADS_TOTAL.with_label_values(&[result]).inc();
}

pub fn record_preference_event(action: &str, status: &str) {
    PREFERENCE_EVENTS_TOTAL
        .with_label_values(&[action, status])
        .inc();
}

/// Render the default registry in Prometheus text format
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
