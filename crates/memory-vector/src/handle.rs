//! Shared handle for serving one store to concurrent callers.
//!
//! Operations are serialized behind a mutex: searches never observe a
//! half-applied insert and positions are assigned without races.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use memory_embeddings::EmbeddingModel;

use crate::error::VectorError;
use crate::store::{InsertOutcome, MemoryStore, SearchResponse, StoreConfig, StoreStats};

/// Cloneable, thread-safe handle to a [`MemoryStore`].
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<Mutex<MemoryStore>>,
}

impl StoreHandle {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Open a store and wrap it.
    pub fn open(config: StoreConfig, dimension: usize) -> Result<Self, VectorError> {
        MemoryStore::open(config, dimension).map(Self::new)
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryStore>, VectorError> {
        self.inner
            .lock()
            .map_err(|e| VectorError::Poisoned(e.to_string()))
    }

    pub fn insert<E>(
        &self,
        path: impl AsRef<Path>,
        summary: &str,
        embedder: &E,
    ) -> Result<InsertOutcome, VectorError>
    where
        E: EmbeddingModel + ?Sized,
    {
        self.lock()?.insert(path, summary, embedder)
    }

    pub fn search<E>(&self, query: &str, k: usize, embedder: &E) -> Result<SearchResponse, VectorError>
    where
        E: EmbeddingModel + ?Sized,
    {
        self.lock()?.search(query, k, embedder)
    }

    pub fn checkpoint(&self) -> Result<(), VectorError> {
        self.lock()?.checkpoint()
    }

    pub fn stats(&self) -> Result<StoreStats, VectorError> {
        Ok(self.lock()?.stats())
    }

    pub fn contains_path(&self, path: impl AsRef<Path>) -> Result<bool, VectorError> {
        Ok(self.lock()?.contains_path(path))
    }

    /// Run a closure with exclusive access to the store.
    pub fn with<T>(&self, f: impl FnOnce(&mut MemoryStore) -> T) -> Result<T, VectorError> {
        let mut store = self.lock()?;
        Ok(f(&mut store))
    }
}
