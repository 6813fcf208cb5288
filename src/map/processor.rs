//! Compute-in-place (entry processors).
//!
//! A processor runs on the owning member with the partition locked. Whatever
//! it does to the entry is replayed through the interceptor chain afterwards:
//! `set_value` is a put, `remove` is a remove.

/// What a processor did to its entry.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum EntryMutation<V> {
    Untouched,
    Set(V),
    Removed,
}

/// View of one entry handed to an `EntryProcessor`.
#[derive(Debug)]
pub struct MutableEntry<K, V> {
    key: K,
    value: Option<V>,
    mutation: EntryMutation<V>,
}

impl<K, V: Clone> MutableEntry<K, V> {
    pub(crate) fn new(key: K, value: Option<V>) -> Self {
        Self {
            key,
            value,
            mutation: EntryMutation::Untouched,
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    /// Current value as seen by the processor, including its own changes.
    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    /// Replaces the value and returns the previous one.
    pub fn set_value(&mut self, value: V) -> Option<V> {
        self.mutation = EntryMutation::Set(value.clone());
        self.value.replace(value)
    }

    /// Marks the entry for removal and returns the previous value.
    pub fn remove(&mut self) -> Option<V> {
        self.mutation = EntryMutation::Removed;
        self.value.take()
    }

    pub(crate) fn into_mutation(self) -> EntryMutation<V> {
        self.mutation
    }
}

/// Server-side computation executed against a single entry.
pub trait EntryProcessor<K, V>: Send + Sync {
    type Output: Send;

    fn process(&self, entry: &mut MutableEntry<K, V>) -> Self::Output;
}
