//! Prometheus metrics for account-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec,
    HistogramVec, TextEncoder,
};

/// Registered users.
pub static USERS_REGISTERED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "account_users_registered_total",
        "Total number of registered users"
    )
    .expect("Failed to register users_registered_total")
});

/// Bank account link attempts by outcome.
pub static ACCOUNT_LINKS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "account_bank_links_total",
        "Total number of bank account link attempts by outcome",
        &["outcome"] // verified, duplicate, name_mismatch, resolution_failed, error
    )
    .expect("Failed to register bank_links_total")
});

/// Provider resolution latency by result.
pub static RESOLVER_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "account_resolver_request_duration_seconds",
        "Bank account resolution request duration in seconds",
        &["result"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("Failed to register resolver_request_duration")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "account_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&USERS_REGISTERED_TOTAL);
    Lazy::force(&ACCOUNT_LINKS_TOTAL);
    Lazy::force(&RESOLVER_REQUEST_DURATION);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}

/// Count one link attempt.
pub fn record_link_outcome(outcome: &str) {
    ACCOUNT_LINKS_TOTAL.with_label_values(&[outcome]).inc();
}
