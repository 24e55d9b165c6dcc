use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Datelike, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::storage::Storage;
use crate::types::{PayoutRequest, PayoutStats, PayoutStatus};

fn request_key(request_id: &str) -> String {
    format!("requests/{}", request_id)
}

fn sequence_key(year: i32) -> String {
    format!("sequence/{}", year)
}

fn storage_err(e: anyhow::Error) -> AppError {
    AppError::database_error(e.to_string())
}

/// Per-doctor aggregate counters, adjusted on every committed write so
/// stats reads never scan the ledger.
#[derive(Debug, Default)]
pub struct DoctorStats {
    total_requested: AtomicU64,
    total_completed: AtomicU64,
    total_failed: AtomicU64,
    pending_amount: AtomicU64,
    completed_amount: AtomicU64,
}

impl DoctorStats {
    fn add_contribution(&self, status: PayoutStatus, amount: u64) {
        if status.is_open() {
            self.pending_amount.fetch_add(amount, Ordering::Relaxed);
        }
        match status {
            PayoutStatus::Completed => {
                self.total_completed.fetch_add(1, Ordering::Relaxed);
                self.completed_amount.fetch_add(amount, Ordering::Relaxed);
            }
            PayoutStatus::Failed => {
                self.total_failed.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    fn remove_contribution(&self, status: PayoutStatus, amount: u64) {
        if status.is_open() {
            self.pending_amount.fetch_sub(amount, Ordering::Relaxed);
        }
        match status {
            PayoutStatus::Completed => {
                self.total_completed.fetch_sub(1, Ordering::Relaxed);
                self.completed_amount.fetch_sub(amount, Ordering::Relaxed);
            }
            PayoutStatus::Failed => {
                self.total_failed.fetch_sub(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    fn record_created(&self, status: PayoutStatus, amount: u64) {
        self.total_requested.fetch_add(1, Ordering::Relaxed);
        self.add_contribution(status, amount);
    }

    fn record_transition(&self, from: PayoutStatus, to: PayoutStatus, amount: u64) {
        if from == to {
            return;
        }
        self.remove_contribution(from, amount);
        self.add_contribution(to, amount);
    }

    pub fn snapshot(&self) -> PayoutStats {
        PayoutStats {
            total_requested: self.total_requested.load(Ordering::Relaxed),
            total_completed: self.total_completed.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
            pending_amount: self.pending_amount.load(Ordering::Relaxed),
            completed_amount: self.completed_amount.load(Ordering::Relaxed),
        }
    }
}

/// Append-mostly store of payout requests: keyed by id, indexed by doctor,
/// rows never physically deleted. Each request sits behind its own mutex so
/// transitions for unrelated requests never serialize against each other.
///
/// Also owns the per-year reference sequence. The counter is read-modify-
/// written through storage under a mutex, never derived from ledger size,
/// so references stay unique under concurrent creation and across restarts.
pub struct PayoutRequestLedger {
    storage: Arc<dyn Storage>,
    requests: RwLock<HashMap<String, Arc<Mutex<PayoutRequest>>>>,
    by_doctor: RwLock<HashMap<String, Vec<String>>>,
    stats: RwLock<HashMap<String, Arc<DoctorStats>>>,
    sequence: Mutex<HashMap<i32, u64>>,
}

impl PayoutRequestLedger {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            requests: RwLock::new(HashMap::new()),
            by_doctor: RwLock::new(HashMap::new()),
            stats: RwLock::new(HashMap::new()),
            sequence: Mutex::new(HashMap::new()),
        }
    }

    /// Rebuild indexes and stats accumulators from storage. Called once at
    /// startup; per-doctor listings come back ordered by request time.
    pub async fn load(&self) -> Result<()> {
        let rows = self.storage.scan_prefix("requests/").await?;

        let mut loaded: Vec<PayoutRequest> = Vec::with_capacity(rows.len());
        for (key, value) in rows {
            match serde_json::from_str::<PayoutRequest>(&value) {
                Ok(request) => loaded.push(request),
                Err(e) => {
                    warn!(key = %key, error = %e, "Skipping undecodable payout request row");
                }
            }
        }
        loaded.sort_by_key(|r| r.requested_at);

        let mut requests = self.requests.write().await;
        let mut by_doctor = self.by_doctor.write().await;
        let mut stats = self.stats.write().await;
        for request in loaded {
            stats
                .entry(request.doctor_id.clone())
                .or_default()
                .record_created(request.status, request.amount);
            by_doctor
                .entry(request.doctor_id.clone())
                .or_default()
                .push(request.id.clone());
            requests.insert(request.id.clone(), Arc::new(Mutex::new(request)));
        }

        debug!(requests = requests.len(), "Payout request ledger loaded");
        Ok(())
    }

    /// Reserve the next reference for the given instant, e.g. `PAY-2026-042`.
    /// The increment is persisted before the reference is handed out.
    pub async fn next_reference(&self, now: DateTime<Utc>) -> Result<String, AppError> {
        let year = now.year();
        let mut sequence = self.sequence.lock().await;

        let current = match sequence.get(&year) {
            Some(n) => *n,
            None => self
                .storage
                .get(&sequence_key(year))
                .await
                .map_err(storage_err)?
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0),
        };

        let next = current + 1;
        self.storage
            .set(&sequence_key(year), &next.to_string())
            .await
            .map_err(storage_err)?;
        sequence.insert(year, next);

        Ok(format!("PAY-{}-{:03}", year, next))
    }

    /// Append a freshly created request.
    pub async fn insert(&self, request: PayoutRequest) -> Result<PayoutRequest, AppError> {
        let value = serde_json::to_string(&request)?;
        self.storage
            .set(&request_key(&request.id), &value)
            .await
            .map_err(storage_err)?;

        self.stats
            .write()
            .await
            .entry(request.doctor_id.clone())
            .or_default()
            .record_created(request.status, request.amount);
        self.by_doctor
            .write()
            .await
            .entry(request.doctor_id.clone())
            .or_default()
            .push(request.id.clone());
        self.requests
            .write()
            .await
            .insert(request.id.clone(), Arc::new(Mutex::new(request.clone())));

        Ok(request)
    }

    async fn entry(&self, request_id: &str) -> Result<Arc<Mutex<PayoutRequest>>, AppError> {
        self.requests
            .read()
            .await
            .get(request_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("payout request not found"))
    }

    pub async fn get(&self, request_id: &str) -> Result<PayoutRequest, AppError> {
        let entry = self.entry(request_id).await?;
        let request = entry.lock().await;
        Ok(request.clone())
    }

    pub async fn list_by_doctor(&self, doctor_id: &str) -> Vec<PayoutRequest> {
        let ids = {
            let by_doctor = self.by_doctor.read().await;
            match by_doctor.get(doctor_id) {
                Some(ids) => ids.clone(),
                None => return Vec::new(),
            }
        };

        let entries: Vec<_> = {
            let requests = self.requests.read().await;
            ids.iter().filter_map(|id| requests.get(id).cloned()).collect()
        };

        let mut result = Vec::with_capacity(entries.len());
        for entry in entries {
            result.push(entry.lock().await.clone());
        }
        result
    }

    /// Apply a mutation to one request under its lock. The mutation runs
    /// against the current row; its result is persisted before memory and
    /// the stats accumulators are touched, so a storage failure leaves the
    /// row exactly as it was. Status and timestamps commit together.
    pub async fn transition<F>(
        &self,
        request_id: &str,
        mutate: F,
    ) -> Result<PayoutRequest, AppError>
    where
        F: FnOnce(&PayoutRequest) -> Result<PayoutRequest, AppError>,
    {
        let entry = self.entry(request_id).await?;
        let mut guard = entry.lock().await;

        let updated = mutate(&guard)?;

        let value = serde_json::to_string(&updated)?;
        self.storage
            .set(&request_key(request_id), &value)
            .await
            .map_err(storage_err)?;

        if let Some(stats) = self.stats.read().await.get(&guard.doctor_id) {
            stats.record_transition(guard.status, updated.status, guard.amount);
        }
        *guard = updated.clone();

        Ok(updated)
    }

    /// Aggregate counters for a doctor; all zeros for an unknown doctor.
    pub async fn stats_for(&self, doctor_id: &str) -> PayoutStats {
        match self.stats.read().await.get(doctor_id) {
            Some(stats) => stats.snapshot(),
            None => PayoutStats::default(),
        }
    }
}
