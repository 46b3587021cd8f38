//! In-process [`BlobStore`] backed by a `DashMap`.
//!
//! An optional byte quota mimics the per-origin limit of browser storage, so
//! the quota-exceeded path can be exercised without a disk.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::StoreError;
use crate::traits::BlobStore;

#[derive(Default)]
pub struct MemoryBlobStore {
    entries: DashMap<String, String>,
    /// Maximum total of key + value bytes. `None` means unbounded.
    quota: Option<usize>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(limit: usize) -> Self {
        Self {
            entries: DashMap::new(),
            quota: Some(limit),
        }
    }

    /// Bytes currently used, counted the way the quota counts them.
    pub fn used_bytes(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.key().len() + e.value().len())
            .sum()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if let Some(limit) = self.quota {
            let replaced = self
                .entries
                .get(key)
                .map(|v| key.len() + v.value().len())
                .unwrap_or(0);
            let requested = self.used_bytes() - replaced + key.len() + value.len();
            if requested > limit {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    requested,
                    limit,
                });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        Ok(keys)
    }
}
