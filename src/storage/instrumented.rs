use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use super::Storage;
use crate::events::{EventBus, PayoutEvent};

/// Statistics for storage operations
#[derive(Debug, Default)]
pub struct StorageStats {
    pub total_operations: AtomicU64,
    pub successful_operations: AtomicU64,
    pub failed_operations: AtomicU64,
    pub slow_operations: AtomicU64,
    pub total_duration_ms: AtomicU64,
}

impl StorageStats {
    pub fn record_operation(&self, duration: Duration, success: bool) {
        self.total_operations.fetch_add(1, Ordering::Relaxed);
        self.total_duration_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);

        if success {
            self.successful_operations.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_operations.fetch_add(1, Ordering::Relaxed);
        }

        // Track slow operations (>100ms)
        if duration.as_millis() > 100 {
            self.slow_operations.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn get_summary(&self) -> StorageStatsSummary {
        let total = self.total_operations.load(Ordering::Relaxed);
        let successful = self.successful_operations.load(Ordering::Relaxed);
        let failed = self.failed_operations.load(Ordering::Relaxed);
        let slow = self.slow_operations.load(Ordering::Relaxed);
        let total_duration = self.total_duration_ms.load(Ordering::Relaxed);

        StorageStatsSummary {
            total_operations: total,
            successful_operations: successful,
            failed_operations: failed,
            slow_operations: slow,
            average_duration_ms: if total > 0 { total_duration / total } else { 0 },
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageStatsSummary {
    pub total_operations: u64,
    pub successful_operations: u64,
    pub failed_operations: u64,
    pub slow_operations: u64,
    pub average_duration_ms: u64,
}

/// Storage wrapper that records operation timings and publishes a storage
/// event for every call, so slow or failing persistence shows up in logs
/// and metrics without touching the call sites.
pub struct InstrumentedStorage<T: Storage> {
    inner: T,
    event_bus: Arc<EventBus>,
    stats: Arc<StorageStats>,
}

impl<T: Storage> InstrumentedStorage<T> {
    pub fn new(inner: T, event_bus: Arc<EventBus>) -> Self {
        Self {
            inner,
            event_bus,
            stats: Arc::new(StorageStats::default()),
        }
    }

    pub fn stats(&self) -> &StorageStats {
        &self.stats
    }

    /// First path segment of a key, so events never carry entity ids.
    fn key_prefix(key: &str) -> String {
        key.split('/').next().unwrap_or("").to_string()
    }

    async fn record<R>(
        &self,
        operation: &'static str,
        key: &str,
        result: Result<R>,
        start: Instant,
    ) -> Result<R> {
        let duration = start.elapsed();
        let success = result.is_ok();
        self.stats.record_operation(duration, success);

        let error_message = result.as_ref().err().map(|e| e.to_string());
        if let Some(ref msg) = error_message {
            warn!(
                operation = operation,
                key_prefix = %Self::key_prefix(key),
                duration_ms = duration.as_millis() as u64,
                error = %msg,
                "Storage operation failed"
            );
        } else {
            debug!(
                operation = operation,
                key_prefix = %Self::key_prefix(key),
                duration_ms = duration.as_millis() as u64,
                "Storage operation completed"
            );
        }

        let event = PayoutEvent::StorageOperation {
            operation: operation.to_string(),
            key_prefix: Self::key_prefix(key),
            duration_ms: duration.as_millis(),
            success,
            error_message,
            timestamp: Utc::now(),
        };
        if let Err(e) = self.event_bus.publish(event).await {
            warn!(error = ?e, "Failed to publish storage event");
        }

        result
    }
}

#[async_trait]
impl<T: Storage> Storage for InstrumentedStorage<T> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let start = Instant::now();
        let result = self.inner.get(key).await;
        self.record("get", key, result, start).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let start = Instant::now();
        let result = self.inner.set(key, value).await;
        self.record("set", key, result, start).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let start = Instant::now();
        let result = self.inner.delete(key).await;
        self.record("delete", key, result, start).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let start = Instant::now();
        let result = self.inner.exists(key).await;
        self.record("exists", key, result, start).await
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        let start = Instant::now();
        let result = self.inner.scan_prefix(prefix).await;
        self.record("scan_prefix", prefix, result, start).await
    }
}

#[cfg(test)]
#[path = "tests/instrumented_tests.rs"]
mod tests;
