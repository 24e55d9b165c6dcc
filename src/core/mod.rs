use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

pub mod ingest;
pub mod ledger;
pub mod lifecycle;
pub mod methods;
pub mod stats;

pub use ingest::{StatusUpdate, WebhookIngester};
pub use ledger::PayoutRequestLedger;
pub use lifecycle::LifecycleController;
pub use methods::PayoutMethodRegistry;
pub use stats::StatsAggregator;

use crate::events::handlers::{LoggingEventHandler, MetricsEventHandler};
use crate::events::EventBus;
use crate::storage::{InstrumentedStorage, Storage};

const EVENT_BUS_CAPACITY: usize = 1024;

/// Wires the registry, ledger, controllers, and event bus over one storage
/// backend. Everything the HTTP layer touches hangs off this.
pub struct PayoutCore {
    pub registry: Arc<PayoutMethodRegistry>,
    pub ledger: Arc<PayoutRequestLedger>,
    pub lifecycle: Arc<LifecycleController>,
    pub ingester: Arc<WebhookIngester>,
    pub stats: Arc<StatsAggregator>,
    pub event_bus: Arc<EventBus>,
    pub start_time: Instant,
}

impl PayoutCore {
    pub async fn new(storage: Arc<dyn Storage>) -> Result<Self> {
        let event_bus = Arc::new(EventBus::new(EVENT_BUS_CAPACITY));
        event_bus
            .register_handler(Arc::new(LoggingEventHandler::new(false)))
            .await;
        event_bus
            .register_handler(Arc::new(MetricsEventHandler::new()))
            .await;

        let storage: Arc<dyn Storage> =
            Arc::new(InstrumentedStorage::new(storage, event_bus.clone()));

        let registry = Arc::new(PayoutMethodRegistry::new(storage.clone(), event_bus.clone()));
        registry.load().await?;

        let ledger = Arc::new(PayoutRequestLedger::new(storage));
        ledger.load().await?;

        let lifecycle = Arc::new(LifecycleController::new(
            registry.clone(),
            ledger.clone(),
            event_bus.clone(),
        ));
        let ingester = Arc::new(WebhookIngester::new(ledger.clone(), event_bus.clone()));
        let stats = Arc::new(StatsAggregator::new(ledger.clone()));

        Ok(Self {
            registry,
            ledger,
            lifecycle,
            ingester,
            stats,
            event_bus,
            start_time: Instant::now(),
        })
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}
