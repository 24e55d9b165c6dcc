use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::core::ledger::PayoutRequestLedger;
use crate::core::methods::PayoutMethodRegistry;
use crate::error::AppError;
use crate::events::{EventBus, PayoutEvent};
use crate::observability::sanitization::sanitize_doctor_id;
use crate::types::{MethodSnapshot, PayoutRequest, PayoutStatus};

const DEFAULT_CURRENCY: &str = "GHS";

/// Enforces the request state machine: create, cancel, retry, plus the
/// worker-path `advance` used by the settlement simulator. All mutations go
/// through the ledger's commit path; the transition table is the single
/// arbiter of what is legal from the current status.
pub struct LifecycleController {
    registry: Arc<PayoutMethodRegistry>,
    ledger: Arc<PayoutRequestLedger>,
    event_bus: Arc<EventBus>,
}

impl LifecycleController {
    pub fn new(
        registry: Arc<PayoutMethodRegistry>,
        ledger: Arc<PayoutRequestLedger>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            registry,
            ledger,
            event_bus,
        }
    }

    #[instrument(skip(self), fields(doctor_id = %sanitize_doctor_id(doctor_id), amount = amount))]
    pub async fn create_request(
        &self,
        doctor_id: &str,
        amount: u64,
        method_id: &str,
        correlation_id: Option<String>,
    ) -> Result<PayoutRequest, AppError> {
        if amount == 0 {
            return Err(AppError::validation_error(
                "amount must be greater than zero",
            ));
        }

        // Ownership check doubles as the snapshot source
        let method = self.registry.get_method(doctor_id, method_id).await?;

        let now = Utc::now();
        let reference = self.ledger.next_reference(now).await?;

        let request = PayoutRequest {
            id: Uuid::new_v4().to_string(),
            doctor_id: doctor_id.to_string(),
            amount,
            currency: DEFAULT_CURRENCY.to_string(),
            status: PayoutStatus::Pending,
            reference: reference.clone(),
            requested_at: now,
            processed_at: None,
            completed_at: None,
            method: MethodSnapshot {
                provider: method.provider,
                number: method.number,
            },
            failure_reason: None,
            estimated_completion: Some(PayoutRequest::estimate_completion(now)),
        };

        let request = self.ledger.insert(request).await?;

        info!(
            request_id = %request.id,
            reference = %reference,
            "Payout request created"
        );
        let _ = self
            .event_bus
            .publish(PayoutEvent::RequestCreated {
                request_id: request.id.clone(),
                doctor_id: doctor_id.to_string(),
                amount,
                reference,
                correlation_id,
                timestamp: now,
            })
            .await;

        Ok(request)
    }

    /// Cancel a request. Legal only from `pending`; the precondition is
    /// re-checked under the request lock, so a stale client view (or a rail
    /// webhook that won the race) surfaces as InvalidState.
    #[instrument(skip(self))]
    pub async fn cancel_request(
        &self,
        request_id: &str,
        correlation_id: Option<String>,
    ) -> Result<PayoutRequest, AppError> {
        let updated = self
            .ledger
            .transition(request_id, |current| {
                if current.status != PayoutStatus::Pending {
                    return Err(AppError::invalid_state(format!(
                        "only pending requests can be cancelled (current status: {})",
                        current.status
                    )));
                }
                let mut next = current.clone();
                next.status = PayoutStatus::Cancelled;
                Ok(next)
            })
            .await?;

        let _ = self
            .event_bus
            .publish(PayoutEvent::RequestCancelled {
                request_id: request_id.to_string(),
                doctor_id: updated.doctor_id.clone(),
                correlation_id: correlation_id.clone(),
                timestamp: Utc::now(),
            })
            .await;
        self.publish_status_change(&updated, PayoutStatus::Pending, "client", correlation_id)
            .await;

        Ok(updated)
    }

    /// Retry a failed request: back to `pending` with the failure evidence
    /// cleared and a fresh completion estimate.
    #[instrument(skip(self))]
    pub async fn retry_request(
        &self,
        request_id: &str,
        correlation_id: Option<String>,
    ) -> Result<PayoutRequest, AppError> {
        let now = Utc::now();
        let updated = self
            .ledger
            .transition(request_id, |current| {
                if current.status != PayoutStatus::Failed {
                    return Err(AppError::invalid_state(format!(
                        "only failed requests can be retried (current status: {})",
                        current.status
                    )));
                }
                let mut next = current.clone();
                next.status = PayoutStatus::Pending;
                next.processed_at = None;
                next.failure_reason = None;
                next.estimated_completion = Some(PayoutRequest::estimate_completion(now));
                Ok(next)
            })
            .await?;

        let _ = self
            .event_bus
            .publish(PayoutEvent::RequestRetried {
                request_id: request_id.to_string(),
                doctor_id: updated.doctor_id.clone(),
                correlation_id: correlation_id.clone(),
                timestamp: now,
            })
            .await;
        self.publish_status_change(&updated, PayoutStatus::Failed, "client", correlation_id)
            .await;

        Ok(updated)
    }

    /// Worker/simulation path: drive a request through the settlement
    /// transitions, stamping the timestamps the rail would report. Only
    /// `processing`, `completed`, and `failed` are reachable this way.
    #[instrument(skip(self, failure_reason))]
    pub async fn advance(
        &self,
        request_id: &str,
        target: PayoutStatus,
        failure_reason: Option<String>,
        correlation_id: Option<String>,
    ) -> Result<PayoutRequest, AppError> {
        if !matches!(
            target,
            PayoutStatus::Processing | PayoutStatus::Completed | PayoutStatus::Failed
        ) {
            return Err(AppError::invalid_state(format!(
                "cannot advance a request to {}",
                target
            )));
        }

        let now = Utc::now();
        let mut from = PayoutStatus::Pending;
        let updated = self
            .ledger
            .transition(request_id, |current| {
                if !current.status.can_transition_to(target) {
                    return Err(AppError::invalid_state(format!(
                        "transition {} -> {} is not permitted",
                        current.status, target
                    )));
                }
                from = current.status;
                let mut next = current.clone();
                next.status = target;
                match target {
                    PayoutStatus::Processing => {
                        next.processed_at = Some(now);
                    }
                    PayoutStatus::Completed => {
                        next.processed_at = next.processed_at.or(Some(now));
                        next.completed_at = Some(now);
                    }
                    PayoutStatus::Failed => {
                        next.processed_at = next.processed_at.or(Some(now));
                        next.failure_reason = failure_reason.clone();
                    }
                    _ => {}
                }
                Ok(next)
            })
            .await?;

        self.publish_status_change(&updated, from, "worker", correlation_id)
            .await;

        Ok(updated)
    }

    async fn publish_status_change(
        &self,
        request: &PayoutRequest,
        from: PayoutStatus,
        source: &str,
        correlation_id: Option<String>,
    ) {
        let _ = self
            .event_bus
            .publish(PayoutEvent::StatusChanged {
                request_id: request.id.clone(),
                doctor_id: request.doctor_id.clone(),
                from: from.to_string(),
                to: request.status.to_string(),
                source: source.to_string(),
                correlation_id,
                timestamp: Utc::now(),
            })
            .await;
    }
}

#[cfg(test)]
#[path = "tests/lifecycle_tests.rs"]
mod tests;
