//! # Collection Accessor
//!
//! A typed array view over one [`BlobStore`] key. Every read parses the full
//! array and every mutation writes the full array back; lookups are linear
//! scans.

use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::Record;
use crate::traits::BlobStore;

pub struct Collection<T> {
    store: Arc<dyn BlobStore>,
    key: &'static str,
    /// Shared with the owning `RecordStore` so single-collection mutations
    /// and multi-collection batches never interleave.
    write_lock: Arc<Mutex<()>>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key: self.key,
            write_lock: Arc::clone(&self.write_lock),
            _record: PhantomData,
        }
    }
}

impl<T: Record> Collection<T> {
    pub fn new(store: Arc<dyn BlobStore>, key: &'static str, write_lock: Arc<Mutex<()>>) -> Self {
        Self {
            store,
            key,
            write_lock,
            _record: PhantomData,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Absent or malformed data loads as an empty collection.
    pub async fn load_all(&self) -> Result<Vec<T>> {
        let Some(raw) = self.store.read(self.key).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(items) => Ok(items),
            Err(e) => {
                warn!(key = self.key, error = %e, "discarding unparsable collection");
                Ok(Vec::new())
            }
        }
    }

    /// Serializes without writing, for batched commits.
    pub fn encode(&self, items: &[T]) -> Result<String> {
        Ok(serde_json::to_string(items)?)
    }

    pub async fn save_all(&self, items: &[T]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_unlocked(items).await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<T>> {
        self.find_first(|item| item.id() == id).await
    }

    pub async fn find_first(&self, predicate: impl Fn(&T) -> bool) -> Result<Option<T>> {
        Ok(self.load_all().await?.into_iter().find(|item| predicate(item)))
    }

    pub async fn find_by(&self, predicate: impl Fn(&T) -> bool) -> Result<Vec<T>> {
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .filter(|item| predicate(item))
            .collect())
    }

    /// Replaces the record with the same id in place, or appends it.
    pub async fn upsert(&self, item: T) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.load_all().await?;
        upsert_into(&mut items, item);
        self.write_unlocked(&items).await
    }

    /// Applies `edit` to the record with `id` and saves. Returns the updated
    /// record, or `None` (and writes nothing) when no record matches.
    pub async fn update<F>(&self, id: &str, edit: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut T),
    {
        let _guard = self.write_lock.lock().await;
        let mut items = self.load_all().await?;
        let Some(item) = items.iter_mut().find(|item| item.id() == id) else {
            return Ok(None);
        };
        edit(item);
        let updated = item.clone();
        self.write_unlocked(&items).await?;
        Ok(Some(updated))
    }

    /// Applies `edit` to every matching record. Writes only when something
    /// matched; returns the number of records edited.
    pub async fn update_where<P, F>(&self, predicate: P, mut edit: F) -> Result<usize>
    where
        P: Fn(&T) -> bool,
        F: FnMut(&mut T),
    {
        let _guard = self.write_lock.lock().await;
        let mut items = self.load_all().await?;
        let mut edited = 0;
        for item in items.iter_mut().filter(|item| predicate(item)) {
            edit(item);
            edited += 1;
        }
        if edited > 0 {
            self.write_unlocked(&items).await?;
        }
        Ok(edited)
    }

    /// Drops every matching record. Writes only when something matched.
    pub async fn remove_where(&self, predicate: impl Fn(&T) -> bool) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.load_all().await?;
        let before = items.len();
        items.retain(|item| !predicate(item));
        let removed = before - items.len();
        if removed > 0 {
            self.write_unlocked(&items).await?;
        }
        Ok(removed)
    }

    async fn write_unlocked(&self, items: &[T]) -> Result<()> {
        let raw = self.encode(items)?;
        self.store.write(self.key, &raw).await?;
        debug!(key = self.key, count = items.len(), "collection saved");
        Ok(())
    }
}

pub(crate) fn upsert_into<T: Record>(items: &mut Vec<T>, item: T) {
    match items.iter_mut().find(|existing| existing.id() == item.id()) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
}
