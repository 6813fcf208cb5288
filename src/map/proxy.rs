//! Distributed Map Proxy
//!
//! `DistributedMap` is the handle user code holds. It resolves the owner of a
//! key through the partition table and forwards the operation to that
//! member's `MapContainer`. Interceptor registrations are broadcast to every
//! alive member under the topology read lock.

use super::definition::MapDefinition;
use super::dispatcher::MapContainer;
use super::events::EntryListener;
use super::processor::EntryProcessor;
use super::types::{ListenerId, MapKey, MapValue};
use crate::cluster::node::ClusterShared;
use crate::error::{LoaderError, MapError, Result};
use crate::interceptor::factory::{InterceptorFactory, InterceptorHandle};
use crate::interceptor::types::{InterceptorId, MapInterceptor, Transportable};
use crate::membership::types::NodeId;

use std::collections::HashMap;
use std::sync::Arc;

pub struct DistributedMap<K: MapKey, V: MapValue> {
    definition: Arc<MapDefinition<K, V>>,
    shared: Arc<ClusterShared>,
    local: NodeId,
}

impl<K: MapKey, V: MapValue> Clone for DistributedMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            definition: self.definition.clone(),
            shared: self.shared.clone(),
            local: self.local.clone(),
        }
    }
}

impl<K: MapKey, V: MapValue> DistributedMap<K, V> {
    pub(crate) fn new(
        definition: Arc<MapDefinition<K, V>>,
        shared: Arc<ClusterShared>,
        local: NodeId,
    ) -> Self {
        Self {
            definition,
            shared,
            local,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Member this handle was obtained from.
    pub fn local_member(&self) -> &NodeId {
        &self.local
    }

    pub fn interceptor_factory(&self) -> Arc<InterceptorFactory<V>> {
        self.definition.factory.clone()
    }

    fn route(&self, key: &K) -> Result<(u32, Arc<MapContainer<K, V>>)> {
        let partition = self.shared.partitioner.get_partition(key);
        let owner = self
            .shared
            .partitioner
            .get_owner(partition)
            .ok_or(MapError::NoOwner(partition))?;
        tracing::trace!("Map '{}': partition {} owned by {}", self.name(), partition, owner);
        Ok((partition, self.container_on(&owner)?))
    }

    fn container_on(&self, member: &NodeId) -> Result<Arc<MapContainer<K, V>>> {
        self.shared.typed_container(member, self.name())
    }

    // --- Interceptor registry ---

    /// Makes `I` decodable on members that receive it. `add_interceptor`
    /// does this implicitly.
    pub fn register_interceptor_kind<I>(&self)
    where
        I: MapInterceptor<V> + Transportable + 'static,
    {
        self.definition.factory.register::<I>();
    }

    /// Appends an interceptor to the chain on every member.
    ///
    /// Each remote member receives a transported copy. If any copy cannot be
    /// produced the registration is rolled back everywhere and the transport
    /// error is returned.
    pub async fn add_interceptor<I>(&self, interceptor: I) -> Result<InterceptorId>
    where
        I: MapInterceptor<V> + Transportable + 'static,
    {
        let _topology = self.shared.topology.read().await;
        self.register_interceptor_kind::<I>();

        let id = InterceptorId::new();
        let handle = InterceptorHandle::new(interceptor);
        let mut installed: Vec<Arc<MapContainer<K, V>>> = Vec::new();

        if let Err(e) = self.install_everywhere(&id, &handle, &mut installed) {
            for container in &installed {
                container.registry().unregister(&id);
            }
            tracing::error!(
                "Map '{}': interceptor of kind '{}' rejected: {}",
                self.name(),
                handle.kind(),
                e
            );
            return Err(e);
        }

        tracing::info!(
            "Map '{}': interceptor {} ({}) installed on {} member(s)",
            self.name(),
            id,
            handle.kind(),
            installed.len()
        );
        Ok(id)
    }

    fn install_everywhere(
        &self,
        id: &InterceptorId,
        handle: &InterceptorHandle<V>,
        installed: &mut Vec<Arc<MapContainer<K, V>>>,
    ) -> Result<()> {
        for member in self.shared.membership.get_alive_members() {
            let container = self.container_on(&member.id)?;
            let copy = if member.id == self.local {
                handle.clone()
            } else {
                self.definition.factory.transport(id, handle)?
            };
            if container.registry().register_with_id(id.clone(), copy)? {
                installed.push(container);
            }
        }
        Ok(())
    }

    /// Removes an interceptor on every member. Unknown ids are a no-op.
    pub async fn remove_interceptor(&self, id: &InterceptorId) -> Result<bool> {
        let _topology = self.shared.topology.read().await;
        let mut removed = false;
        for member in self.shared.membership.get_alive_members() {
            removed |= self.container_on(&member.id)?.registry().unregister(id);
        }
        Ok(removed)
    }

    /// Registered interceptor ids in chain order, as seen by the local member.
    pub fn interceptor_ids(&self) -> Result<Vec<InterceptorId>> {
        Ok(self.container_on(&self.local)?.registry().ids())
    }

    // --- Entry operations ---

    /// Reads a value through the get chain, consulting the loader on a miss.
    pub async fn get(&self, key: &K) -> Result<Option<V>> {
        let _topology = self.shared.topology.read().await;
        let (partition, owner) = self.route(key)?;
        if let Some(value) = owner.get(partition, key)? {
            return Ok(Some(value));
        }

        let Some(loader) = self.definition.loader.as_ref() else {
            return Ok(None);
        };
        let Some(loaded) = loader.load(key).await? else {
            return Ok(None);
        };

        owner.put_loaded(
            partition,
            key.clone(),
            loaded,
            false,
            self.definition.publish_load_events,
        )?;
        owner.get(partition, key)
    }

    /// Stores a value through the put chain and returns the previously
    /// stored value.
    pub async fn put(&self, key: K, value: V) -> Result<Option<V>> {
        let _topology = self.shared.topology.read().await;
        let (partition, owner) = self.route(&key)?;
        owner.put(partition, key, value)
    }

    /// Removes a key through the remove chain.
    ///
    /// Fails with `MapError::Veto` when an interceptor refuses; the entry is
    /// then left untouched.
    pub async fn remove(&self, key: &K) -> Result<Option<V>> {
        let _topology = self.shared.topology.read().await;
        let (partition, owner) = self.route(key)?;
        owner.remove(partition, key)
    }

    /// Reads several keys at once. Missing keys are loaded in batches when
    /// a loader is configured; keys nobody knows are absent from the result.
    pub async fn get_all<I>(&self, keys: I) -> Result<HashMap<K, V>>
    where
        I: IntoIterator<Item = K>,
    {
        let _topology = self.shared.topology.read().await;
        let mut found = HashMap::new();
        let mut missing = Vec::new();

        for key in keys {
            let (partition, owner) = self.route(&key)?;
            match owner.get(partition, &key)? {
                Some(value) => {
                    found.insert(key, value);
                }
                None => missing.push(key),
            }
        }

        if let Some(loader) = self.definition.loader.as_ref()
            && !missing.is_empty()
        {
            let batches = loader.load_batches(&missing).await;
            for (key, value) in batches.loaded {
                let (partition, owner) = self.route(&key)?;
                owner.put_loaded(
                    partition,
                    key.clone(),
                    value,
                    false,
                    self.definition.publish_load_events,
                )?;
                if let Some(value) = owner.get(partition, &key)? {
                    found.insert(key, value);
                }
            }
            if let Some(failure) = batches.failures.into_iter().next() {
                return Err(failure.into());
            }
        }

        Ok(found)
    }

    /// Bulk-loads `keys` from the loader through the put chain.
    ///
    /// With `replace_existing` unset, keys already in the map are skipped.
    /// Batches that succeed stay committed even if another batch fails; the
    /// failure is then reported as `LoaderError::Partial`. Returns the number
    /// of entries written.
    pub async fn load_all<I>(&self, keys: I, replace_existing: bool) -> Result<usize>
    where
        I: IntoIterator<Item = K>,
    {
        let _topology = self.shared.topology.read().await;
        let Some(loader) = self.definition.loader.as_ref() else {
            tracing::debug!("Map '{}' has no loader, load_all ignored", self.name());
            return Ok(0);
        };

        let mut pending = Vec::new();
        for key in keys {
            if !replace_existing {
                let (partition, owner) = self.route(&key)?;
                if owner.contains_key(partition, &key) {
                    continue;
                }
            }
            pending.push(key);
        }

        let requested = pending.len();
        let batches = loader.load_batches(&pending).await;
        let mut stored = 0;

        for (key, value) in batches.loaded {
            let (partition, owner) = self.route(&key)?;
            if owner.put_loaded(
                partition,
                key,
                value,
                replace_existing,
                self.definition.publish_load_events,
            )? {
                stored += 1;
            }
        }

        tracing::info!(
            "Map '{}': loaded {} of {} requested key(s)",
            self.name(),
            stored,
            requested
        );

        if !batches.failures.is_empty() {
            let reason = batches
                .failures
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(LoaderError::Partial {
                requested,
                failed: batches.failed_keys,
                reason,
            }
            .into());
        }

        Ok(stored)
    }

    /// Loads every key the loader can enumerate.
    pub async fn load_all_keys_from_source(&self, replace_existing: bool) -> Result<usize> {
        let Some(loader) = self.definition.loader.as_ref() else {
            return Ok(0);
        };
        match loader.load_all_keys().await? {
            Some(keys) => self.load_all(keys, replace_existing).await,
            None => {
                tracing::debug!("Loader of map '{}' cannot enumerate keys", self.name());
                Ok(0)
            }
        }
    }

    /// Runs `processor` on the owner of `key`. A value it sets goes through
    /// the put chain, a removal through the remove chain.
    pub async fn execute_on_key<P>(&self, key: K, processor: &P) -> Result<P::Output>
    where
        P: EntryProcessor<K, V> + ?Sized,
    {
        let _topology = self.shared.topology.read().await;
        let (partition, owner) = self.route(&key)?;
        owner.execute_on_key(partition, key, processor)
    }

    pub async fn execute_on_keys<I, P>(&self, keys: I, processor: &P) -> Result<HashMap<K, P::Output>>
    where
        I: IntoIterator<Item = K>,
        P: EntryProcessor<K, V> + ?Sized,
    {
        let _topology = self.shared.topology.read().await;
        let mut results = HashMap::new();
        for key in keys {
            let (partition, owner) = self.route(&key)?;
            let output = owner.execute_on_key(partition, key.clone(), processor)?;
            results.insert(key, output);
        }
        Ok(results)
    }

    /// Whether `key` is stored. Neither the chain nor the loader is involved.
    pub async fn contains_key(&self, key: &K) -> Result<bool> {
        let _topology = self.shared.topology.read().await;
        let (partition, owner) = self.route(key)?;
        Ok(owner.contains_key(partition, key))
    }

    /// Number of entries across all members.
    pub async fn size(&self) -> Result<usize> {
        let _topology = self.shared.topology.read().await;
        let mut total = 0;
        for member in self.shared.membership.get_alive_members() {
            total += self.container_on(&member.id)?.size();
        }
        Ok(total)
    }

    // --- Listeners ---

    pub fn add_entry_listener(&self, listener: impl EntryListener<K, V> + 'static) -> ListenerId {
        self.definition.events.add_listener(Arc::new(listener))
    }

    pub fn remove_entry_listener(&self, id: &ListenerId) -> bool {
        self.definition.events.remove_listener(id)
    }

    /// Drops the map's data, interceptors and listeners on every member.
    pub async fn destroy(&self) {
        let _topology = self.shared.topology.write().await;
        if self.shared.remove_map(self.name()) {
            tracing::info!("Map '{}' destroyed", self.name());
        }
    }
}
