use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::ledger::PayoutRequestLedger;
use crate::error::{AppError, ErrorCategory};
use crate::events::{EventBus, PayoutEvent};
use crate::types::{PayoutRequest, PayoutStatus};

/// A status change reported by the payment rail.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub request_id: String,
    pub status: PayoutStatus,
    pub processed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub estimated_completion: Option<DateTime<Utc>>,
}

/// Applies rail-reported status changes to the ledger.
///
/// Rail deliveries retry and are not ordered relative to local user
/// actions, so this path has to be idempotent and defensive: re-delivery of
/// the current status is a no-op, and any transition outside the table
/// (including everything out of a terminal state) is refused as a conflict
/// rather than overwriting whichever valid transition got there first.
pub struct WebhookIngester {
    ledger: Arc<PayoutRequestLedger>,
    event_bus: Arc<EventBus>,
}

impl WebhookIngester {
    pub fn new(ledger: Arc<PayoutRequestLedger>, event_bus: Arc<EventBus>) -> Self {
        Self { ledger, event_bus }
    }

    #[instrument(skip(self, update), fields(request_id = %update.request_id, status = %update.status))]
    pub async fn apply_status_update(
        &self,
        update: &StatusUpdate,
        correlation_id: Option<String>,
    ) -> Result<PayoutRequest, AppError> {
        let now = Utc::now();
        let mut duplicate = false;
        let mut from = update.status;

        let result = self
            .ledger
            .transition(&update.request_id, |current| {
                if current.status == update.status {
                    duplicate = true;
                    return Ok(current.clone());
                }

                // The rail never resets a request to pending; that is the
                // user-visible retry operation.
                if update.status == PayoutStatus::Pending
                    || !current.status.can_transition_to(update.status)
                {
                    return Err(AppError::conflict(format!(
                        "status update {} -> {} conflicts with the transition table",
                        current.status, update.status
                    )));
                }

                from = current.status;
                let mut next = current.clone();
                next.status = update.status;
                match update.status {
                    PayoutStatus::Processing => {
                        next.processed_at = update.processed_at.or(Some(now));
                    }
                    PayoutStatus::Completed => {
                        next.processed_at =
                            next.processed_at.or(update.processed_at).or(Some(now));
                        next.completed_at = update.completed_at.or(Some(now));
                    }
                    PayoutStatus::Failed => {
                        next.processed_at =
                            next.processed_at.or(update.processed_at).or(Some(now));
                        next.failure_reason = Some(
                            update
                                .failure_reason
                                .clone()
                                .unwrap_or_else(|| "reported by payment rail".to_string()),
                        );
                    }
                    // pending -> cancelled is in the table; rails report it
                    // when the operator voids a transfer before pickup
                    PayoutStatus::Cancelled => {}
                    PayoutStatus::Pending => {}
                }
                if let Some(eta) = update.estimated_completion {
                    next.estimated_completion = Some(eta);
                }
                Ok(next)
            })
            .await;

        match result {
            Ok(request) => {
                if duplicate {
                    debug!(
                        request_id = %update.request_id,
                        status = %update.status,
                        "Duplicate rail delivery, no-op"
                    );
                } else {
                    let _ = self
                        .event_bus
                        .publish(PayoutEvent::StatusChanged {
                            request_id: request.id.clone(),
                            doctor_id: request.doctor_id.clone(),
                            from: from.to_string(),
                            to: request.status.to_string(),
                            source: "rail".to_string(),
                            correlation_id,
                            timestamp: now,
                        })
                        .await;
                }
                Ok(request)
            }
            Err(err) => {
                if matches!(err.category, ErrorCategory::Conflict) {
                    // Best-effort read for the rejection event; the row is
                    // untouched either way.
                    if let Ok(current) = self.ledger.get(&update.request_id).await {
                        let _ = self
                            .event_bus
                            .publish(PayoutEvent::WebhookRejected {
                                request_id: update.request_id.clone(),
                                current_status: current.status.to_string(),
                                reported_status: update.status.to_string(),
                                correlation_id,
                                timestamp: now,
                            })
                            .await;
                    }
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/ingest_tests.rs"]
mod tests;
