use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{EventHandler, PayoutEvent};
use crate::observability::sanitization::sanitize_doctor_id;

/// Event handler that logs all events with appropriate levels and
/// sanitization. Doctor identifiers are masked; amounts and references are
/// safe to log in full.
pub struct LoggingEventHandler {
    include_debug_events: bool,
}

impl LoggingEventHandler {
    pub fn new(include_debug_events: bool) -> Self {
        Self {
            include_debug_events,
        }
    }
}

#[async_trait]
impl EventHandler for LoggingEventHandler {
    async fn handle(&self, event: PayoutEvent) -> anyhow::Result<()> {
        match event {
            PayoutEvent::RequestCreated {
                request_id,
                doctor_id,
                amount,
                reference,
                correlation_id,
                timestamp,
            } => {
                info!(
                    event_type = "request_created",
                    request_id = %request_id,
                    doctor_id = %sanitize_doctor_id(&doctor_id),
                    amount = amount,
                    reference = %reference,
                    correlation_id = ?correlation_id,
                    timestamp = %timestamp,
                    "Payout request created"
                );
            }
            PayoutEvent::RequestCancelled {
                request_id,
                doctor_id,
                correlation_id,
                timestamp,
            } => {
                info!(
                    event_type = "request_cancelled",
                    request_id = %request_id,
                    doctor_id = %sanitize_doctor_id(&doctor_id),
                    correlation_id = ?correlation_id,
                    timestamp = %timestamp,
                    "Payout request cancelled"
                );
            }
            PayoutEvent::RequestRetried {
                request_id,
                doctor_id,
                correlation_id,
                timestamp,
            } => {
                info!(
                    event_type = "request_retried",
                    request_id = %request_id,
                    doctor_id = %sanitize_doctor_id(&doctor_id),
                    correlation_id = ?correlation_id,
                    timestamp = %timestamp,
                    "Payout request retried"
                );
            }
            PayoutEvent::StatusChanged {
                request_id,
                doctor_id,
                from,
                to,
                source,
                correlation_id,
                timestamp,
            } => {
                info!(
                    event_type = "status_changed",
                    request_id = %request_id,
                    doctor_id = %sanitize_doctor_id(&doctor_id),
                    from = %from,
                    to = %to,
                    source = %source,
                    correlation_id = ?correlation_id,
                    timestamp = %timestamp,
                    "Payout request status changed"
                );
            }
            PayoutEvent::WebhookRejected {
                request_id,
                current_status,
                reported_status,
                correlation_id,
                timestamp,
            } => {
                warn!(
                    event_type = "webhook_rejected",
                    request_id = %request_id,
                    current_status = %current_status,
                    reported_status = %reported_status,
                    correlation_id = ?correlation_id,
                    timestamp = %timestamp,
                    "Rail status update rejected by transition table"
                );
            }
            PayoutEvent::MethodAdded {
                method_id,
                doctor_id,
                provider,
                correlation_id,
                timestamp,
            } => {
                info!(
                    event_type = "method_added",
                    method_id = %method_id,
                    doctor_id = %sanitize_doctor_id(&doctor_id),
                    provider = %provider,
                    correlation_id = ?correlation_id,
                    timestamp = %timestamp,
                    "Payout method added"
                );
            }
            PayoutEvent::MethodDeleted {
                method_id,
                doctor_id,
                correlation_id,
                timestamp,
            } => {
                info!(
                    event_type = "method_deleted",
                    method_id = %method_id,
                    doctor_id = %sanitize_doctor_id(&doctor_id),
                    correlation_id = ?correlation_id,
                    timestamp = %timestamp,
                    "Payout method deleted"
                );
            }
            PayoutEvent::DefaultMethodChanged {
                method_id,
                doctor_id,
                correlation_id,
                timestamp,
            } => {
                info!(
                    event_type = "default_method_changed",
                    method_id = %method_id,
                    doctor_id = %sanitize_doctor_id(&doctor_id),
                    correlation_id = ?correlation_id,
                    timestamp = %timestamp,
                    "Default payout method changed"
                );
            }
            PayoutEvent::StorageOperation {
                operation,
                key_prefix,
                duration_ms,
                success,
                error_message,
                timestamp,
            } => {
                if self.include_debug_events {
                    debug!(
                        event_type = "storage_operation",
                        operation = %operation,
                        key_prefix = %key_prefix,
                        duration_ms = duration_ms as u64,
                        success = success,
                        error_message = ?error_message,
                        timestamp = %timestamp,
                        "Storage operation"
                    );
                }
            }
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "logging"
    }
}
