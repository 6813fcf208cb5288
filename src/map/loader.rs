//! External Source Adapter
//!
//! Bridges a user-provided `MapLoader` to the map. The adapter only fetches;
//! the dispatcher feeds every resolved pair through the put chain before it
//! becomes an entry. Keys the loader does not resolve never enter the map.

use super::types::{MapKey, MapValue};
use crate::error::LoaderError;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Source of record consulted for keys missing from the map.
#[async_trait]
pub trait MapLoader<K: MapKey, V: MapValue>: Send + Sync {
    async fn load(&self, key: &K) -> anyhow::Result<Option<V>>;

    /// Loads several keys; unresolved keys are simply absent from the result.
    async fn load_all(&self, keys: &[K]) -> anyhow::Result<HashMap<K, V>> {
        let mut loaded = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.load(key).await? {
                loaded.insert(key.clone(), value);
            }
        }
        Ok(loaded)
    }

    /// Every key the source knows about, or `None` when it cannot enumerate.
    async fn load_all_keys(&self) -> anyhow::Result<Option<Vec<K>>> {
        Ok(None)
    }
}

/// Outcome of a batched bulk load.
#[derive(Debug)]
pub struct LoadBatches<K, V> {
    pub loaded: Vec<(K, V)>,
    pub failures: Vec<LoaderError>,
    pub failed_keys: usize,
}

pub struct LoaderAdapter<K: MapKey, V: MapValue> {
    loader: Arc<dyn MapLoader<K, V>>,
    batch_size: usize,
}

impl<K: MapKey, V: MapValue> Clone for LoaderAdapter<K, V> {
    fn clone(&self) -> Self {
        Self {
            loader: self.loader.clone(),
            batch_size: self.batch_size,
        }
    }
}

impl<K: MapKey, V: MapValue> LoaderAdapter<K, V> {
    pub fn new(loader: Arc<dyn MapLoader<K, V>>, batch_size: usize) -> Self {
        Self {
            loader,
            batch_size: batch_size.max(1),
        }
    }

    pub async fn load(&self, key: &K) -> Result<Option<V>, LoaderError> {
        self.loader.load(key).await.map_err(|e| LoaderError::Failed {
            keys: 1,
            reason: e.to_string(),
        })
    }

    /// Loads `keys` in batches. A failing batch does not stop the others.
    pub async fn load_batches(&self, keys: &[K]) -> LoadBatches<K, V> {
        let mut result = LoadBatches {
            loaded: Vec::new(),
            failures: Vec::new(),
            failed_keys: 0,
        };

        for batch in keys.chunks(self.batch_size) {
            match self.loader.load_all(batch).await {
                Ok(values) => {
                    tracing::debug!("Loader resolved {} of {} key(s)", values.len(), batch.len());
                    result.loaded.extend(values);
                }
                Err(e) => {
                    tracing::warn!("Loader batch of {} key(s) failed: {}", batch.len(), e);
                    result.failed_keys += batch.len();
                    result.failures.push(LoaderError::Failed {
                        keys: batch.len(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        result
    }

    pub async fn load_all_keys(&self) -> Result<Option<Vec<K>>, LoaderError> {
        self.loader.load_all_keys().await.map_err(|e| LoaderError::Failed {
            keys: 0,
            reason: e.to_string(),
        })
    }
}
