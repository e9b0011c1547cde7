//! Key-value store abstraction for reading the health-check string.
//!
//! The poller only ever needs a single read operation. Implement
//! [`HealthStore`] for whatever client your worker already holds; the
//! `arq-metrics-adapters` crate ships a Redis implementation.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::StoreError;

/// Read access to the key-value store arq writes its health check to.
///
/// # Example
///
/// ```
/// use arq_metrics::{HealthStore, MemoryStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = MemoryStore::new();
/// store.set("arq:queue:health-check", "j_complete=1 j_failed=0 j_retried=0 j_ongoing=0 queued=0");
///
/// let raw = store.get("arq:queue:health-check").await.unwrap();
/// assert!(raw.is_some());
/// # }
/// ```
#[async_trait]
pub trait HealthStore: Send + Sync + Debug {
    /// Read the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key does not exist. Any `Err` is treated as
    /// an unexpected failure and stops the poller.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
}

#[async_trait]
impl<T: HealthStore + ?Sized> HealthStore for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key).await
    }
}

/// An in-process store backed by a map.
///
/// Useful when the health check is produced inside the same process, and in
/// tests. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value for a key, replacing any previous value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.write().insert(key.into(), value.into());
    }

    /// Remove a key, returning its previous value.
    pub fn remove(&self, key: &str) -> Option<String> {
        self.entries.write().remove(key)
    }
}

#[async_trait]
impl HealthStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }
}
