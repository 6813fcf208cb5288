//! Interceptor Registry
//!
//! Per-map, per-member ordered collection of registered interceptors.
//!
//! The chain is stored as a copy-on-write `Arc<Vec<_>>`: writers clone the
//! vector, modify the clone and swap it in; operations grab the current `Arc`
//! once and keep using it even if the registry changes underneath them.

use super::factory::InterceptorHandle;
use super::types::InterceptorId;
use crate::error::{MapError, Result};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// A registered interceptor together with its id and registration sequence.
pub struct RegistryEntry<V> {
    pub id: InterceptorId,
    pub order: u64,
    pub handle: InterceptorHandle<V>,
}

impl<V> Clone for RegistryEntry<V> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            order: self.order,
            handle: self.handle.clone(),
        }
    }
}

/// Point-in-time view of the chain used by one operation.
pub type RegistrySnapshot<V> = Arc<Vec<RegistryEntry<V>>>;

pub struct InterceptorRegistry<V> {
    map_name: String,
    entries: RwLock<RegistrySnapshot<V>>,
    next_order: AtomicU64,
    destroyed: AtomicBool,
}

impl<V: 'static> InterceptorRegistry<V> {
    pub fn new(map_name: &str) -> Self {
        Self {
            map_name: map_name.to_string(),
            entries: RwLock::new(Arc::new(Vec::new())),
            next_order: AtomicU64::new(0),
            destroyed: AtomicBool::new(false),
        }
    }

    /// Appends an interceptor under a freshly generated id.
    pub fn register(&self, handle: InterceptorHandle<V>) -> Result<InterceptorId> {
        let id = InterceptorId::new();
        self.register_with_id(id.clone(), handle)?;
        Ok(id)
    }

    /// Appends an interceptor under an id minted elsewhere.
    ///
    /// Returns `Ok(false)` when the id is already registered, so replays of
    /// the same registration are harmless.
    pub fn register_with_id(&self, id: InterceptorId, handle: InterceptorHandle<V>) -> Result<bool> {
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        // Checked under the write lock so a concurrent destroy leaves no entry behind.
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(MapError::Destroyed(self.map_name.clone()));
        }
        if guard.iter().any(|entry| entry.id == id) {
            return Ok(false);
        }

        let mut next: Vec<RegistryEntry<V>> = guard.iter().cloned().collect();
        next.push(RegistryEntry {
            id: id.clone(),
            order: self.next_order.fetch_add(1, Ordering::SeqCst),
            handle,
        });
        *guard = Arc::new(next);

        tracing::info!(
            "Registered interceptor {} on map '{}' (chain length {})",
            id,
            self.map_name,
            guard.len()
        );
        Ok(true)
    }

    /// Removes an interceptor. An unknown id is not an error.
    pub fn unregister(&self, id: &InterceptorId) -> bool {
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if !guard.iter().any(|entry| &entry.id == id) {
            tracing::debug!("Interceptor {} not registered on map '{}'", id, self.map_name);
            return false;
        }

        let next: Vec<RegistryEntry<V>> = guard
            .iter()
            .filter(|entry| &entry.id != id)
            .cloned()
            .collect();
        *guard = Arc::new(next);

        tracing::info!("Removed interceptor {} from map '{}'", id, self.map_name);
        true
    }

    pub fn snapshot(&self) -> RegistrySnapshot<V> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn ids(&self) -> Vec<InterceptorId> {
        self.snapshot().iter().map(|entry| entry.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Drops every interceptor and refuses further registrations.
    pub fn destroy(&self) {
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        self.destroyed.store(true, Ordering::SeqCst);
        *guard = Arc::new(Vec::new());
    }
}
