use std::time::Duration;

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

// Define metric names as constants to avoid typos
pub const PAYOUT_REQUESTS_TOTAL: &str = "payoutd_requests_total";
pub const PAYOUT_AMOUNT_MINOR: &str = "payoutd_amount_minor_units";
pub const PAYOUT_TRANSITIONS_TOTAL: &str = "payoutd_transitions_total";
pub const PAYOUT_WEBHOOK_REJECTIONS_TOTAL: &str = "payoutd_webhook_rejections_total";

pub const METHODS_TOTAL: &str = "payoutd_methods_total";

pub const API_REQUESTS_TOTAL: &str = "payoutd_api_requests_total";
pub const API_REQUEST_DURATION_SECONDS: &str = "payoutd_api_request_duration_seconds";

pub const STORAGE_OPERATIONS_TOTAL: &str = "payoutd_storage_operations_total";
pub const STORAGE_OPERATION_DURATION_SECONDS: &str = "payoutd_storage_operation_duration_seconds";

const EXPONENTIAL_SECONDS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Install the Prometheus recorder and describe all metrics. Returns the
/// handle whose `render()` output backs the `/metrics` route.
pub fn init_prometheus_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(API_REQUEST_DURATION_SECONDS.to_string()),
            EXPONENTIAL_SECONDS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(STORAGE_OPERATION_DURATION_SECONDS.to_string()),
            EXPONENTIAL_SECONDS,
        )?
        .install_recorder()?;

    describe_counter!(
        PAYOUT_REQUESTS_TOTAL,
        "Total payout requests created, cancelled, and retried"
    );
    describe_histogram!(
        PAYOUT_AMOUNT_MINOR,
        "Payout request amounts in currency minor units"
    );
    describe_counter!(
        PAYOUT_TRANSITIONS_TOTAL,
        "Status transitions applied to payout requests"
    );
    describe_counter!(
        PAYOUT_WEBHOOK_REJECTIONS_TOTAL,
        "Rail status updates rejected by the transition table"
    );
    describe_counter!(METHODS_TOTAL, "Payout method registry operations");
    describe_counter!(API_REQUESTS_TOTAL, "Total HTTP API requests");
    describe_histogram!(
        API_REQUEST_DURATION_SECONDS,
        "HTTP API request duration in seconds"
    );
    describe_counter!(STORAGE_OPERATIONS_TOTAL, "Total storage operations");
    describe_histogram!(
        STORAGE_OPERATION_DURATION_SECONDS,
        "Storage operation duration in seconds"
    );

    Ok(handle)
}

pub mod api_metrics {
    use metrics::{counter, histogram};

    use super::*;

    pub fn record_api_request(method: &str, path: &str, status_code: u16, duration: Duration) {
        counter!(
            API_REQUESTS_TOTAL,
            "method" => method.to_string(),
            "path" => path.to_string(),
            "status" => status_code.to_string()
        )
        .increment(1);

        histogram!(
            API_REQUEST_DURATION_SECONDS,
            "method" => method.to_string(),
            "path" => path.to_string()
        )
        .record(duration.as_secs_f64());
    }
}
