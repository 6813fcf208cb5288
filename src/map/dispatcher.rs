//! Mutation Dispatcher
//!
//! `MapContainer` is one member's copy of one map. It executes the owner side
//! of every operation: take a registry snapshot, lock the key's partition, run
//! the pipeline stage, touch the store, then publish the change notification
//! with the post-chain value. Vetoed and failed operations publish nothing.

use super::events::MapEventBus;
use super::processor::{EntryMutation, EntryProcessor, MutableEntry};
use super::types::{EntryEvent, EntryEventType, MapKey, MapValue};
use crate::error::Result;
use crate::interceptor::factory::InterceptorFactory;
use crate::interceptor::pipeline;
use crate::interceptor::registry::{InterceptorRegistry, RegistryEntry};
use crate::membership::types::NodeId;
use crate::storage::record_store::RecordStore;

use std::collections::HashMap;
use std::sync::Arc;

pub struct MapContainer<K: MapKey, V: MapValue> {
    name: String,
    member: NodeId,
    store: RecordStore<K, V>,
    registry: InterceptorRegistry<V>,
    factory: Arc<InterceptorFactory<V>>,
    events: Arc<MapEventBus<K, V>>,
}

impl<K: MapKey, V: MapValue> MapContainer<K, V> {
    pub fn new(
        name: &str,
        member: NodeId,
        partition_count: u32,
        factory: Arc<InterceptorFactory<V>>,
        events: Arc<MapEventBus<K, V>>,
    ) -> Self {
        Self {
            name: name.to_string(),
            member,
            store: RecordStore::new(partition_count),
            registry: InterceptorRegistry::new(name),
            factory,
            events,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn member(&self) -> &NodeId {
        &self.member
    }

    pub fn registry(&self) -> &InterceptorRegistry<V> {
        &self.registry
    }

    pub fn factory(&self) -> &InterceptorFactory<V> {
        &self.factory
    }

    /// Stored value run through the get chain; `None` when the key is absent.
    pub fn get(&self, partition: u32, key: &K) -> Result<Option<V>> {
        let chain = self.registry.snapshot();
        let stored = self.store.get(partition, key);
        pipeline::intercept_get(&chain, stored)
    }

    pub fn contains_key(&self, partition: u32, key: &K) -> bool {
        self.store.contains_key(partition, key)
    }

    /// Stores the put-chain output and returns the previously stored value.
    pub fn put(&self, partition: u32, key: K, value: V) -> Result<Option<V>> {
        let chain = self.registry.snapshot();
        self.store.with_partition(partition, |records| -> Result<Option<V>> {
            let old = records.get(&key).cloned();
            self.store_through_chain(&chain, records, key, old.clone(), value, true)?;
            Ok(old)
        })
    }

    /// Stores a value fetched from the loader. Runs the same put chain as
    /// `put`; the notification is only published when `publish` is set.
    ///
    /// Returns `false` when the key exists and `replace_existing` is unset.
    pub fn put_loaded(
        &self,
        partition: u32,
        key: K,
        value: V,
        replace_existing: bool,
        publish: bool,
    ) -> Result<bool> {
        let chain = self.registry.snapshot();
        self.store.with_partition(partition, |records| -> Result<bool> {
            let old = records.get(&key).cloned();
            if old.is_some() && !replace_existing {
                return Ok(false);
            }
            self.store_through_chain(&chain, records, key, old, value, publish)?;
            Ok(true)
        })
    }

    /// Removes an entry unless an interceptor vetoes it.
    ///
    /// Returns the remove-chain output. On veto the entry keeps its value and
    /// `MapError::Veto` is returned.
    pub fn remove(&self, partition: u32, key: &K) -> Result<Option<V>> {
        let chain = self.registry.snapshot();
        self.store.with_partition(partition, |records| -> Result<Option<V>> {
            let Some(current) = records.get(key).cloned() else {
                return Ok(None);
            };
            let removed = self.remove_through_chain(&chain, records, key, current)?;
            Ok(Some(removed))
        })
    }

    /// Runs `processor` against one entry and replays its mutation through
    /// the interceptor chain.
    pub fn execute_on_key<P>(&self, partition: u32, key: K, processor: &P) -> Result<P::Output>
    where
        P: EntryProcessor<K, V> + ?Sized,
    {
        let chain = self.registry.snapshot();
        self.store.with_partition(partition, |records| -> Result<P::Output> {
            let current = records.get(&key).cloned();
            let mut entry = MutableEntry::new(key.clone(), current.clone());
            let output = processor.process(&mut entry);

            match entry.into_mutation() {
                EntryMutation::Untouched => {}
                EntryMutation::Set(value) => {
                    self.store_through_chain(&chain, records, key, current, value, true)?;
                }
                EntryMutation::Removed => {
                    if let Some(current) = current {
                        self.remove_through_chain(&chain, records, &key, current)?;
                    }
                }
            }

            Ok(output)
        })
    }

    pub fn size(&self) -> usize {
        self.store.size()
    }

    pub(crate) fn drain_partition(&self, partition: u32) -> Vec<(K, V)> {
        self.store.drain_partition(partition)
    }

    /// Inserts already-intercepted records; used by partition migration.
    pub(crate) fn apply_partition_entries(&self, partition: u32, entries: Vec<(K, V)>) {
        self.store.apply_partition_entries(partition, entries);
    }

    pub fn destroy(&self) {
        self.registry.destroy();
        self.store.clear();
        tracing::info!("Destroyed map '{}' on member {}", self.name, self.member);
    }

    fn store_through_chain(
        &self,
        chain: &[RegistryEntry<V>],
        records: &mut HashMap<K, V>,
        key: K,
        old: Option<V>,
        value: V,
        publish: bool,
    ) -> Result<()> {
        let stored = pipeline::intercept_put(chain, old.as_ref(), value)?;
        records.insert(key.clone(), stored.clone());
        pipeline::after_put(chain, &stored);

        if publish {
            let event_type = if old.is_some() {
                EntryEventType::Updated
            } else {
                EntryEventType::Added
            };
            self.publish(event_type, key, Some(stored), old);
        }
        Ok(())
    }

    fn remove_through_chain(
        &self,
        chain: &[RegistryEntry<V>],
        records: &mut HashMap<K, V>,
        key: &K,
        current: V,
    ) -> Result<V> {
        let removed = pipeline::intercept_remove(chain, current)?;
        records.remove(key);
        pipeline::after_remove(chain, &removed);
        self.publish(EntryEventType::Removed, key.clone(), None, Some(removed.clone()));
        Ok(removed)
    }

    fn publish(&self, event_type: EntryEventType, key: K, value: Option<V>, old_value: Option<V>) {
        self.events.publish(EntryEvent {
            map_name: self.name.clone(),
            event_type,
            key,
            value,
            old_value,
            member: self.member.clone(),
        });
    }
}
