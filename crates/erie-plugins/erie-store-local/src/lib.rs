//! # erie-store-local
//! erie/crates/erie-plugins/erie-store-local/src/lib.rs
//! Local filesystem implementation of `BlobStore`.
//! One file per key under a data directory; writes go through a temp file
//! and a rename so a crash never leaves a half-written collection.

use std::path::PathBuf;

use async_trait::async_trait;
use erie_core::error::StoreError;
use erie_core::traits::BlobStore;
use tokio::fs;
use tracing::debug;

const EXTENSION: &str = "json";

pub struct LocalBlobStore {
    /// Directory holding one `<key>.json` file per key (e.g., "./data")
    root_path: PathBuf,
    /// Maximum total of key + value bytes, counted like `MemoryBlobStore`
    quota: Option<u64>,
}

impl LocalBlobStore {
    /// Creates the data directory if needed.
    pub async fn open(root: PathBuf, quota: Option<u64>) -> Result<Self, StoreError> {
        fs::create_dir_all(&root).await?;
        debug!(root = %root.display(), ?quota, "local blob store opened");
        Ok(Self {
            root_path: root,
            quota,
        })
    }

    /// Keys become file names, so only a conservative alphabet is allowed.
    fn key_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        let mut path = self.root_path.clone();
        path.push(format!("{key}.{EXTENSION}"));
        Ok(path)
    }

    async fn used_bytes_excluding(&self, key: &str) -> Result<u64, StoreError> {
        let mut total = 0;
        let mut entries = fs::read_dir(&self.root_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem == key {
                continue;
            }
            total += stem.len() as u64 + entry.metadata().await?.len();
        }
        Ok(total)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.key_path(key)?;
        if let Some(limit) = self.quota {
            let requested =
                self.used_bytes_excluding(key).await? + (key.len() + value.len()) as u64;
            if requested > limit {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    requested: requested as usize,
                    limit: limit as usize,
                });
            }
        }

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value).await?;
        fs::rename(&tmp, &path).await?;
        debug!(key, bytes = value.len(), "blob written");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.root_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn values_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::open(dir.path().to_path_buf(), None).await.unwrap();
        store.write("erie_posts", "[]").await.unwrap();
        drop(store);

        let store = LocalBlobStore::open(dir.path().to_path_buf(), None).await.unwrap();
        assert_eq!(store.read("erie_posts").await.unwrap().as_deref(), Some("[]"));
        assert_eq!(store.keys().await.unwrap(), ["erie_posts"]);
    }

    #[tokio::test]
    async fn missing_key_and_double_remove_are_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::open(dir.path().to_path_buf(), None).await.unwrap();
        assert_eq!(store.read("erie_user").await.unwrap(), None);
        store.remove("erie_user").await.unwrap();
    }

    #[tokio::test]
    async fn path_like_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::open(dir.path().to_path_buf(), None).await.unwrap();
        let err = store.write("../escape", "x").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn quota_counts_other_keys_but_not_the_replaced_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::open(dir.path().to_path_buf(), Some(10)).await.unwrap();
        store.write("a", "123456").await.unwrap();
        store.write("a", "abcdef").await.unwrap();

        let err = store.write("b", "12345").await.unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { limit: 10, .. }));
        assert_eq!(store.read("b").await.unwrap(), None);
    }
}
