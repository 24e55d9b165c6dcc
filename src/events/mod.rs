use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub mod handlers;

/// Domain events published by the registry, the lifecycle controller, and
/// the webhook ingester. Statuses travel as plain strings so subscribers
/// can consume the stream without the domain types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PayoutEvent {
    // Request lifecycle events
    RequestCreated {
        request_id: String,
        doctor_id: String,
        amount: u64,
        reference: String,
        correlation_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
    RequestCancelled {
        request_id: String,
        doctor_id: String,
        correlation_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
    RequestRetried {
        request_id: String,
        doctor_id: String,
        correlation_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
    StatusChanged {
        request_id: String,
        doctor_id: String,
        from: String,
        to: String,
        /// Who drove the transition: "client", "rail", or "worker".
        source: String,
        correlation_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
    WebhookRejected {
        request_id: String,
        current_status: String,
        reported_status: String,
        correlation_id: Option<String>,
        timestamp: DateTime<Utc>,
    },

    // Payout method events
    MethodAdded {
        method_id: String,
        doctor_id: String,
        provider: String,
        correlation_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
    MethodDeleted {
        method_id: String,
        doctor_id: String,
        correlation_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
    DefaultMethodChanged {
        method_id: String,
        doctor_id: String,
        correlation_id: Option<String>,
        timestamp: DateTime<Utc>,
    },

    // Storage events
    StorageOperation {
        operation: String,
        key_prefix: String,
        duration_ms: u128,
        success: bool,
        error_message: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl PayoutEvent {
    /// Generate a unique event ID
    pub fn event_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Get the event timestamp
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            PayoutEvent::RequestCreated { timestamp, .. } => *timestamp,
            PayoutEvent::RequestCancelled { timestamp, .. } => *timestamp,
            PayoutEvent::RequestRetried { timestamp, .. } => *timestamp,
            PayoutEvent::StatusChanged { timestamp, .. } => *timestamp,
            PayoutEvent::WebhookRejected { timestamp, .. } => *timestamp,
            PayoutEvent::MethodAdded { timestamp, .. } => *timestamp,
            PayoutEvent::MethodDeleted { timestamp, .. } => *timestamp,
            PayoutEvent::DefaultMethodChanged { timestamp, .. } => *timestamp,
            PayoutEvent::StorageOperation { timestamp, .. } => *timestamp,
        }
    }

    /// Get the correlation ID if present
    pub fn correlation_id(&self) -> Option<&String> {
        match self {
            PayoutEvent::RequestCreated { correlation_id, .. } => correlation_id.as_ref(),
            PayoutEvent::RequestCancelled { correlation_id, .. } => correlation_id.as_ref(),
            PayoutEvent::RequestRetried { correlation_id, .. } => correlation_id.as_ref(),
            PayoutEvent::StatusChanged { correlation_id, .. } => correlation_id.as_ref(),
            PayoutEvent::WebhookRejected { correlation_id, .. } => correlation_id.as_ref(),
            PayoutEvent::MethodAdded { correlation_id, .. } => correlation_id.as_ref(),
            PayoutEvent::MethodDeleted { correlation_id, .. } => correlation_id.as_ref(),
            PayoutEvent::DefaultMethodChanged { correlation_id, .. } => correlation_id.as_ref(),
            PayoutEvent::StorageOperation { .. } => None,
        }
    }

    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            PayoutEvent::RequestCreated { .. } => "request_created",
            PayoutEvent::RequestCancelled { .. } => "request_cancelled",
            PayoutEvent::RequestRetried { .. } => "request_retried",
            PayoutEvent::StatusChanged { .. } => "status_changed",
            PayoutEvent::WebhookRejected { .. } => "webhook_rejected",
            PayoutEvent::MethodAdded { .. } => "method_added",
            PayoutEvent::MethodDeleted { .. } => "method_deleted",
            PayoutEvent::DefaultMethodChanged { .. } => "default_method_changed",
            PayoutEvent::StorageOperation { .. } => "storage_operation",
        }
    }
}

/// Trait for handling events asynchronously
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an event
    async fn handle(&self, event: PayoutEvent) -> anyhow::Result<()>;

    /// Get the name of this handler for identification
    fn name(&self) -> &str;

    /// Whether this handler should block event publishing on failure
    fn is_critical(&self) -> bool {
        false
    }
}

/// Event bus for distributing events to multiple handlers
pub struct EventBus {
    sender: broadcast::Sender<PayoutEvent>,
    handlers: Arc<RwLock<Vec<Arc<dyn EventHandler>>>>,
    max_capacity: usize,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("max_capacity", &self.max_capacity)
            .field(
                "handlers_count",
                &self.handlers.try_read().map(|h| h.len()).unwrap_or(0),
            )
            .finish()
    }
}

impl EventBus {
    /// Create a new event bus with the specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            handlers: Arc::new(RwLock::new(Vec::new())),
            max_capacity: capacity,
        }
    }

    /// Register an event handler
    pub async fn register_handler(&self, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().await;
        let handler_name = handler.name().to_string();
        handlers.push(handler);
        info!(
            handler_name = %handler_name,
            total_handlers = handlers.len(),
            "Event handler registered"
        );
    }

    /// Publish an event to all registered handlers
    pub async fn publish(&self, event: PayoutEvent) -> anyhow::Result<()> {
        let event_id = event.event_id();
        let event_type = event.event_type();

        debug!(
            event_id = %event_id,
            event_type = %event_type,
            correlation_id = ?event.correlation_id(),
            "Publishing event"
        );

        // Send to broadcast channel for real-time subscribers (non-blocking)
        if let Err(broadcast::error::SendError(_)) = self.sender.send(event.clone()) {
            // No active receivers, this is not an error
            debug!(
                event_id = %event_id,
                event_type = %event_type,
                "Event published but no active subscribers"
            );
        }

        let handlers = self.handlers.read().await;
        if handlers.is_empty() {
            return Ok(());
        }

        let mut critical_handler_futures = Vec::new();

        for handler in handlers.iter() {
            let handler_clone = handler.clone();
            let event_clone = event.clone();
            let event_id_clone = event_id.clone();

            if handler.is_critical() {
                // Critical handlers: await them to ensure they complete
                critical_handler_futures.push(async move {
                    if let Err(e) = handler_clone.handle(event_clone).await {
                        error!(
                            event_id = %event_id_clone,
                            handler_name = %handler_clone.name(),
                            error = ?e,
                            "Critical event handler failed"
                        );
                    }
                });
            } else {
                // Non-critical handlers: spawn them in the background
                tokio::spawn(async move {
                    if let Err(e) = handler_clone.handle(event_clone).await {
                        warn!(
                            event_id = %event_id_clone,
                            handler_name = %handler_clone.name(),
                            error = ?e,
                            "Event handler failed"
                        );
                    }
                });
            }
        }

        for future in critical_handler_futures {
            future.await;
        }

        Ok(())
    }

    /// Subscribe to the event stream for real-time event processing
    pub fn subscribe(&self) -> broadcast::Receiver<PayoutEvent> {
        self.sender.subscribe()
    }

    /// Get the current number of registered handlers
    pub async fn handler_count(&self) -> usize {
        self.handlers.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingHandler {
        count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _event: PayoutEvent) -> anyhow::Result<()> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &str {
            "counting"
        }

        fn is_critical(&self) -> bool {
            true
        }
    }

    fn sample_event() -> PayoutEvent {
        PayoutEvent::RequestCreated {
            request_id: "r1".to_string(),
            doctor_id: "doc_123".to_string(),
            amount: 800,
            reference: "PAY-2026-001".to_string(),
            correlation_id: Some("corr-1".to_string()),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(sample_event()).await.unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "request_created");
        assert_eq!(event.correlation_id(), Some(&"corr-1".to_string()));
    }

    #[tokio::test]
    async fn test_critical_handler_runs_before_publish_returns() {
        let bus = EventBus::new(16);
        let count = Arc::new(AtomicUsize::new(0));
        bus.register_handler(Arc::new(CountingHandler {
            count: count.clone(),
        }))
        .await;

        bus.publish(sample_event()).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.handler_count().await, 1);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = EventBus::new(4);
        assert!(bus.publish(sample_event()).await.is_ok());
    }
}
