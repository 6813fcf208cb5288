//! Partitioned record store
//!
//! Holds the stored (already intercepted) values of one map on one member.
//! Each partition sits behind its own mutex, so every operation on a key is
//! serialized with every other operation on the same partition.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

pub struct RecordStore<K, V> {
    partitions: Vec<Mutex<HashMap<K, V>>>,
}

impl<K, V> RecordStore<K, V>
where
    K: Clone + Hash + Eq,
    V: Clone,
{
    pub fn new(partition_count: u32) -> Self {
        let partitions = (0..partition_count)
            .map(|_| Mutex::new(HashMap::new()))
            .collect();
        Self { partitions }
    }

    /// Runs `f` with exclusive access to one partition.
    pub fn with_partition<R>(&self, partition: u32, f: impl FnOnce(&mut HashMap<K, V>) -> R) -> R {
        let mut guard = self.partitions[partition as usize]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn get(&self, partition: u32, key: &K) -> Option<V> {
        self.with_partition(partition, |records| records.get(key).cloned())
    }

    pub fn contains_key(&self, partition: u32, key: &K) -> bool {
        self.with_partition(partition, |records| records.contains_key(key))
    }

    pub fn partition_size(&self, partition: u32) -> usize {
        self.with_partition(partition, |records| records.len())
    }

    pub fn size(&self) -> usize {
        (0..self.partitions.len() as u32)
            .map(|partition| self.partition_size(partition))
            .sum()
    }

    /// Empties a partition and hands its records to the caller.
    pub fn drain_partition(&self, partition: u32) -> Vec<(K, V)> {
        self.with_partition(partition, |records| records.drain().collect())
    }

    pub fn apply_partition_entries(&self, partition: u32, entries: Vec<(K, V)>) {
        self.with_partition(partition, |records| records.extend(entries));
    }

    pub fn clear(&self) {
        for partition in 0..self.partitions.len() as u32 {
            self.with_partition(partition, |records| records.clear());
        }
    }
}
