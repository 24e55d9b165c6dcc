use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

use crate::core::PayoutCore;
use crate::events::EventBus;
use crate::storage::{FileStorage, MemoryStorage, Storage};

#[derive(Clone)]
pub struct AppState {
    pub core: Arc<PayoutCore>,
}

impl AppState {
    pub async fn new_with_core(core: PayoutCore) -> Result<Self> {
        let core = Arc::new(core);
        Ok(Self { core })
    }

    /// Open the ledger file under the data directory and wire everything up.
    pub async fn new(data_dir: PathBuf) -> Result<Self> {
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::open(data_dir.join("payoutd.json"))?);
        let core = PayoutCore::new(storage).await?;
        Self::new_with_core(core).await
    }

    /// Fully in-memory state, used by tests.
    pub async fn new_in_memory() -> Result<Self> {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let core = PayoutCore::new(storage).await?;
        Self::new_with_core(core).await
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.core.uptime()
    }

    pub fn start_time(&self) -> Instant {
        self.core.start_time
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.core.event_bus
    }
}
