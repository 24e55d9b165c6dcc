use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

pub mod instrumented;

pub use instrumented::{InstrumentedStorage, StorageStats, StorageStatsSummary};

/// Keyed durable store underneath the registry and the ledger. Keys are
/// slash-separated paths (`requests/{id}`, `methods/{doctor}/{id}`,
/// `sequence/{year}`); values are JSON documents.
///
/// The registry and ledger keep their own in-memory indexes and use this
/// trait purely for durability, so an implementation only needs point
/// operations plus a prefix scan for startup recovery.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn exists(&self, key: &str) -> Result<bool>;
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>>;
}

#[async_trait]
impl<T: Storage + ?Sized> Storage for std::sync::Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        (**self).exists(key).await
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        (**self).scan_prefix(prefix).await
    }
}

/// Purely in-memory storage, used by tests and as the fallback when no data
/// directory is configured.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.entries.read().await.contains_key(key))
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        let entries = self.entries.read().await;
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

/// File-backed storage: the full key space lives in memory and is flushed to
/// a single JSON document on every mutation, written to a temp file and
/// renamed so the file on disk is never partially written.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or create) the backing file and load existing entries.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let entries = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    async fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let contents = serde_json::to_string(entries)?;
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents).await?;
        match tokio::fs::rename(&temp_path, &self.path).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = tokio::fs::remove_file(&temp_path).await;
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        self.flush(&entries).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.entries.read().await.contains_key(key))
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        let entries = self.entries.read().await;
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        storage.set("requests/abc", "{\"id\":\"abc\"}").await.unwrap();

        assert!(storage.exists("requests/abc").await.unwrap());
        assert_eq!(
            storage.get("requests/abc").await.unwrap(),
            Some("{\"id\":\"abc\"}".to_string())
        );

        storage.delete("requests/abc").await.unwrap();
        assert!(!storage.exists("requests/abc").await.unwrap());
        assert_eq!(storage.get("requests/abc").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_storage_scan_prefix() {
        let storage = MemoryStorage::new();
        storage.set("methods/doc_1/m1", "a").await.unwrap();
        storage.set("methods/doc_1/m2", "b").await.unwrap();
        storage.set("methods/doc_2/m3", "c").await.unwrap();
        storage.set("requests/r1", "d").await.unwrap();

        let hits = storage.scan_prefix("methods/doc_1/").await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, "methods/doc_1/m1");
        assert_eq!(hits[1].0, "methods/doc_1/m2");

        let all_methods = storage.scan_prefix("methods/").await.unwrap();
        assert_eq!(all_methods.len(), 3);
    }

    #[tokio::test]
    async fn test_file_storage_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("payoutd.db");

        {
            let storage = FileStorage::open(&path).unwrap();
            storage.set("sequence/2026", "41").await.unwrap();
            storage.set("requests/r1", "{}").await.unwrap();
            storage.delete("requests/r1").await.unwrap();
        }

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(
            storage.get("sequence/2026").await.unwrap(),
            Some("41".to_string())
        );
        assert_eq!(storage.get("requests/r1").await.unwrap(), None);
    }
}
