use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::events::{EventBus, PayoutEvent};
use crate::observability::sanitization::{sanitize_doctor_id, sanitize_msisdn};
use crate::storage::Storage;
use crate::types::{MethodType, PayoutMethod, Provider};

/// Registry of withdrawal destinations, keyed per doctor.
///
/// Every mutation for a doctor runs under that doctor's mutex, so flipping
/// the default flag off the previous default and onto the new one is a
/// single critical section. Two racing default-sets serialize; the loser
/// observes the winner's state and still leaves exactly one default.
pub struct PayoutMethodRegistry {
    storage: Arc<dyn Storage>,
    doctors: RwLock<HashMap<String, Arc<Mutex<Vec<PayoutMethod>>>>>,
    // method id -> owning doctor, so deletion by id alone can find its shard
    owners: RwLock<HashMap<String, String>>,
    event_bus: Arc<EventBus>,
}

fn method_key(doctor_id: &str, method_id: &str) -> String {
    format!("methods/{}/{}", doctor_id, method_id)
}

fn storage_err(e: anyhow::Error) -> AppError {
    AppError::database_error(e.to_string())
}

impl PayoutMethodRegistry {
    pub fn new(storage: Arc<dyn Storage>, event_bus: Arc<EventBus>) -> Self {
        Self {
            storage,
            doctors: RwLock::new(HashMap::new()),
            owners: RwLock::new(HashMap::new()),
            event_bus,
        }
    }

    /// Rebuild the in-memory shards from storage. Called once at startup.
    pub async fn load(&self) -> Result<()> {
        let rows = self.storage.scan_prefix("methods/").await?;

        let mut doctors = self.doctors.write().await;
        let mut owners = self.owners.write().await;
        for (key, value) in rows {
            let method: PayoutMethod = match serde_json::from_str(&value) {
                Ok(m) => m,
                Err(e) => {
                    warn!(key = %key, error = %e, "Skipping undecodable payout method row");
                    continue;
                }
            };
            owners.insert(method.id.clone(), method.doctor_id.clone());
            doctors
                .entry(method.doctor_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
                .lock()
                .await
                .push(method);
        }

        debug!(doctors = doctors.len(), "Payout method registry loaded");
        Ok(())
    }

    async fn doctor_shard(&self, doctor_id: &str) -> Arc<Mutex<Vec<PayoutMethod>>> {
        {
            let doctors = self.doctors.read().await;
            if let Some(shard) = doctors.get(doctor_id) {
                return shard.clone();
            }
        }
        let mut doctors = self.doctors.write().await;
        doctors
            .entry(doctor_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
            .clone()
    }

    /// Persist a flipped copy of every currently-default method, then clear
    /// the flag in memory. Runs inside the per-doctor critical section; a
    /// failure part-way leaves zero defaults rather than two.
    async fn clear_default(&self, methods: &mut [PayoutMethod]) -> Result<(), AppError> {
        for method in methods.iter_mut().filter(|m| m.is_default) {
            let mut flipped = method.clone();
            flipped.is_default = false;
            let value = serde_json::to_string(&flipped)?;
            self.storage
                .set(&method_key(&flipped.doctor_id, &flipped.id), &value)
                .await
                .map_err(storage_err)?;
            method.is_default = false;
        }
        Ok(())
    }

    #[instrument(skip(self, number), fields(doctor_id = %sanitize_doctor_id(doctor_id), provider = %provider))]
    pub async fn add_method(
        &self,
        doctor_id: &str,
        provider: Provider,
        number: &str,
        is_default: bool,
        correlation_id: Option<String>,
    ) -> Result<PayoutMethod, AppError> {
        if !provider.validates_number(number) {
            return Err(AppError::validation_error(format!(
                "number {} is not a valid {} mobile-money number",
                sanitize_msisdn(number),
                provider
            )));
        }
        let clean: String = number.chars().filter(|c| !c.is_whitespace()).collect();

        let shard = self.doctor_shard(doctor_id).await;
        let mut methods = shard.lock().await;

        if is_default {
            self.clear_default(&mut methods).await?;
        }

        let method = PayoutMethod {
            id: Uuid::new_v4().to_string(),
            doctor_id: doctor_id.to_string(),
            method_type: MethodType::MobileMoney,
            provider,
            number: clean,
            is_default,
        };

        let value = serde_json::to_string(&method)?;
        self.storage
            .set(&method_key(doctor_id, &method.id), &value)
            .await
            .map_err(storage_err)?;
        methods.push(method.clone());
        drop(methods);

        self.owners
            .write()
            .await
            .insert(method.id.clone(), doctor_id.to_string());

        let _ = self
            .event_bus
            .publish(PayoutEvent::MethodAdded {
                method_id: method.id.clone(),
                doctor_id: doctor_id.to_string(),
                provider: provider.to_string(),
                correlation_id: correlation_id.clone(),
                timestamp: Utc::now(),
            })
            .await;
        if is_default {
            let _ = self
                .event_bus
                .publish(PayoutEvent::DefaultMethodChanged {
                    method_id: method.id.clone(),
                    doctor_id: doctor_id.to_string(),
                    correlation_id,
                    timestamp: Utc::now(),
                })
                .await;
        }

        Ok(method)
    }

    #[instrument(skip(self), fields(doctor_id = %sanitize_doctor_id(doctor_id)))]
    pub async fn set_default(
        &self,
        doctor_id: &str,
        method_id: &str,
        correlation_id: Option<String>,
    ) -> Result<PayoutMethod, AppError> {
        let shard = self.doctor_shard(doctor_id).await;
        let mut methods = shard.lock().await;

        if !methods.iter().any(|m| m.id == method_id) {
            return Err(AppError::not_found("payout method not found"));
        }

        self.clear_default(&mut methods).await?;

        // Lookup repeated after the flip; clear_default only mutates flags,
        // never membership.
        let method = methods
            .iter_mut()
            .find(|m| m.id == method_id)
            .ok_or_else(|| AppError::internal_error("method vanished during default toggle"))?;
        method.is_default = true;
        let value = serde_json::to_string(&*method)?;
        self.storage
            .set(&method_key(doctor_id, method_id), &value)
            .await
            .map_err(storage_err)?;
        let updated = method.clone();
        drop(methods);

        let _ = self
            .event_bus
            .publish(PayoutEvent::DefaultMethodChanged {
                method_id: method_id.to_string(),
                doctor_id: doctor_id.to_string(),
                correlation_id,
                timestamp: Utc::now(),
            })
            .await;

        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_method(
        &self,
        method_id: &str,
        correlation_id: Option<String>,
    ) -> Result<(), AppError> {
        let doctor_id = self
            .owners
            .read()
            .await
            .get(method_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("payout method not found"))?;

        let shard = self.doctor_shard(&doctor_id).await;
        let mut methods = shard.lock().await;

        let position = methods
            .iter()
            .position(|m| m.id == method_id)
            .ok_or_else(|| AppError::not_found("payout method not found"))?;

        self.storage
            .delete(&method_key(&doctor_id, method_id))
            .await
            .map_err(storage_err)?;
        let removed = methods.remove(position);
        drop(methods);

        self.owners.write().await.remove(method_id);

        if removed.is_default {
            warn!(
                method_id = %method_id,
                doctor_id = %sanitize_doctor_id(&doctor_id),
                "Deleted the doctor's current default payout method"
            );
        }

        let _ = self
            .event_bus
            .publish(PayoutEvent::MethodDeleted {
                method_id: method_id.to_string(),
                doctor_id,
                correlation_id,
                timestamp: Utc::now(),
            })
            .await;

        Ok(())
    }

    pub async fn list_methods(&self, doctor_id: &str) -> Vec<PayoutMethod> {
        let shard = {
            let doctors = self.doctors.read().await;
            match doctors.get(doctor_id) {
                Some(shard) => shard.clone(),
                None => return Vec::new(),
            }
        };
        let methods = shard.lock().await;
        methods.clone()
    }

    /// Fetch a method, enforcing ownership by the given doctor.
    pub async fn get_method(
        &self,
        doctor_id: &str,
        method_id: &str,
    ) -> Result<PayoutMethod, AppError> {
        let shard = {
            let doctors = self.doctors.read().await;
            doctors.get(doctor_id).cloned()
        };
        let shard = shard.ok_or_else(|| AppError::not_found("payout method not found"))?;
        let methods = shard.lock().await;
        methods
            .iter()
            .find(|m| m.id == method_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("payout method not found"))
    }
}

#[cfg(test)]
#[path = "tests/method_tests.rs"]
mod tests;
