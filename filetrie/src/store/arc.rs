//! Arc Store.

use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::info;
use serde_json::Value;

use super::error::Result;
use super::sort::{Entry, SortMode};
use super::storage::Trie;
use super::{Store, StoreOptions};

/// Build custom open options.
#[derive(Debug, Clone, Default)]
pub struct OpenOptions(StoreOptions);

impl OpenOptions {
    pub fn new() -> Self {
        Self(StoreOptions::default())
    }

    pub fn piece_length(mut self, value: usize) -> Self {
        self.0.piece_length = value;
        self
    }

    /// 0 disables truncation.
    pub fn key_length_limit(mut self, value: usize) -> Self {
        self.0.key_length_limit = value;
        self
    }

    pub fn suffix(mut self, value: impl Into<String>) -> Self {
        self.0.suffix = value.into();
        self
    }

    pub fn random_pool_factor(mut self, value: usize) -> Self {
        self.0.random_pool_factor = value;
        self
    }

    pub fn open(&self, path: impl AsRef<Path>) -> Result<Store> {
        Store::open_with_options(path, self.0.clone())
    }

    pub fn open_shared(&self, path: impl AsRef<Path>) -> Result<SharedTrie> {
        SharedTrie::open_with_options(path, self.0.clone())
    }
}

/// Store handle for multiple threads.
///
/// Calls are serialized through a lock inside this process only; other
/// processes opening the same directory are not excluded.
///
/// The filter of [`Trie::prefixed_filtered`] runs while the lock is held,
/// so it must not write through a clone of the same handle or it will
/// deadlock.
#[derive(Debug)]
pub struct SharedTrie {
    inner: Arc<RwLock<Store>>,
}

impl SharedTrie {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, StoreOptions::default())
    }

    pub fn open_with_options(path: impl AsRef<Path>, opts: StoreOptions) -> Result<Self> {
        let store = RwLock::new(Store::open_with_options(path, opts)?);
        Ok(Self {
            inner: Arc::new(store),
        })
    }

    // poisoning is ignored, all state besides metadata lives on disk.
    fn read(&self) -> RwLockReadGuard<'_, Store> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Store> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn data(&self) -> Value {
        self.read().data().clone()
    }

    pub fn set_data(&self, data: impl Into<Value>) -> Result<()> {
        self.write().set_data(data)
    }
}

impl Clone for SharedTrie {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Trie for SharedTrie {
    fn insert(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.write().insert(key, value)
    }

    fn get(&self, key: &str) -> Result<Option<Value>> {
        self.read().get(key)
    }

    fn has(&self, key: &str) -> Result<bool> {
        self.read().has(key)
    }

    fn count(&self, key: &str) -> Result<u64> {
        self.read().count(key)
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        self.write().remove(key)
    }

    fn prefixed_filtered<F>(
        &self,
        prefix: &str,
        limit: usize,
        sort: SortMode,
        filter: F,
    ) -> Result<Vec<Entry>>
    where
        F: FnMut(&str, &Value, u64) -> bool,
    {
        self.read().prefixed_filtered(prefix, limit, sort, filter)
    }

    fn key_count(&self) -> u64 {
        self.read().key_count()
    }

    fn sync(&mut self) -> Result<()> {
        self.write().sync()
    }

    fn close(&mut self) -> Result<()> {
        self.write().close()
    }
}

impl Drop for SharedTrie {
    fn drop(&mut self) {
        if Arc::strong_count(&self.inner) == 1 {
            info!("last shared handle of {} dropped", self.read().path().display());
        }
    }
}
