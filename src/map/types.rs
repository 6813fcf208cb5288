use crate::membership::types::NodeId;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;
use std::hash::Hash;

/// Bounds every map key satisfies: hashable for partitioning, serde for
/// migration between members, thread-safe for the partition workers.
pub trait MapKey: Clone + Hash + Eq + Send + Sync + Serialize + DeserializeOwned + 'static {}

impl<T> MapKey for T where T: Clone + Hash + Eq + Send + Sync + Serialize + DeserializeOwned + 'static {}

/// Bounds every map value satisfies.
pub trait MapValue: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {}

impl<T> MapValue for T where T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EntryEventType {
    Added,
    Updated,
    Removed,
}

/// Change notification published after a committed mutation.
///
/// `value` is always the output of the interceptor chain: the stored value
/// for `Added`/`Updated`. For `Removed`, `value` is `None` and `old_value`
/// carries the remove-chain output.
#[derive(Debug, Clone)]
pub struct EntryEvent<K, V> {
    pub map_name: String,
    pub event_type: EntryEventType,
    pub key: K,
    pub value: Option<V>,
    pub old_value: Option<V>,
    /// Member that owned the key when the mutation committed.
    pub member: NodeId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ListenerId(pub String);

impl ListenerId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
