use async_trait::async_trait;
use metrics::{counter, histogram};

use crate::events::{EventHandler, PayoutEvent};
use crate::metrics::{
    METHODS_TOTAL, PAYOUT_AMOUNT_MINOR, PAYOUT_REQUESTS_TOTAL, PAYOUT_TRANSITIONS_TOTAL,
    PAYOUT_WEBHOOK_REJECTIONS_TOTAL, STORAGE_OPERATIONS_TOTAL,
    STORAGE_OPERATION_DURATION_SECONDS,
};

/// Event handler that collects metrics from events for Prometheus export.
/// Labels stay low-cardinality: statuses, providers, and operations only,
/// never doctor or request identifiers.
pub struct MetricsEventHandler;

impl MetricsEventHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MetricsEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventHandler for MetricsEventHandler {
    async fn handle(&self, event: PayoutEvent) -> anyhow::Result<()> {
        match event {
            PayoutEvent::RequestCreated { amount, .. } => {
                counter!(PAYOUT_REQUESTS_TOTAL, "operation" => "created").increment(1);
                histogram!(PAYOUT_AMOUNT_MINOR).record(amount as f64);
            }
            PayoutEvent::RequestCancelled { .. } => {
                counter!(PAYOUT_REQUESTS_TOTAL, "operation" => "cancelled").increment(1);
            }
            PayoutEvent::RequestRetried { .. } => {
                counter!(PAYOUT_REQUESTS_TOTAL, "operation" => "retried").increment(1);
            }
            PayoutEvent::StatusChanged {
                from, to, source, ..
            } => {
                counter!(
                    PAYOUT_TRANSITIONS_TOTAL,
                    "from" => from,
                    "to" => to,
                    "source" => source
                )
                .increment(1);
            }
            PayoutEvent::WebhookRejected {
                current_status,
                reported_status,
                ..
            } => {
                counter!(
                    PAYOUT_WEBHOOK_REJECTIONS_TOTAL,
                    "current" => current_status,
                    "reported" => reported_status
                )
                .increment(1);
            }
            PayoutEvent::MethodAdded { provider, .. } => {
                counter!(METHODS_TOTAL, "operation" => "added", "provider" => provider)
                    .increment(1);
            }
            PayoutEvent::MethodDeleted { .. } => {
                counter!(METHODS_TOTAL, "operation" => "deleted").increment(1);
            }
            PayoutEvent::DefaultMethodChanged { .. } => {
                counter!(METHODS_TOTAL, "operation" => "default_changed").increment(1);
            }
            PayoutEvent::StorageOperation {
                operation,
                duration_ms,
                success,
                ..
            } => {
                counter!(
                    STORAGE_OPERATIONS_TOTAL,
                    "operation" => operation.clone(),
                    "success" => success.to_string()
                )
                .increment(1);
                histogram!(STORAGE_OPERATION_DURATION_SECONDS, "operation" => operation)
                    .record(duration_ms as f64 / 1000.0);
            }
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "metrics"
    }
}
