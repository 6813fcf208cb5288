use crate::membership::{service::MembershipService, types::NodeId};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Maps keys to partitions and partitions to their owning member.
pub struct PartitionManager {
    pub(crate) num_partitions: u32,
    membership: Arc<MembershipService>,
}

impl PartitionManager {
    pub fn new(membership: Arc<MembershipService>, num_partitions: u32) -> Arc<Self> {
        Arc::new(Self {
            num_partitions,
            membership,
        })
    }

    pub fn partition_count(&self) -> u32 {
        self.num_partitions
    }

    pub fn get_partition<K: Hash + ?Sized>(&self, key: &K) -> u32 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let hash = hasher.finish() as u32;
        hash % self.num_partitions
    }

    /// Owner of `partition` among the currently alive members.
    pub fn get_owner(&self, partition: u32) -> Option<NodeId> {
        let node_ids = self.alive_node_ids();
        owner_among(partition, &node_ids)
    }

    /// Owner of every partition, indexed by partition id.
    pub fn partition_table(&self) -> Vec<Option<NodeId>> {
        let node_ids = self.alive_node_ids();
        (0..self.num_partitions)
            .map(|partition| owner_among(partition, &node_ids))
            .collect()
    }

    fn alive_node_ids(&self) -> Vec<NodeId> {
        let mut node_ids: Vec<NodeId> = self
            .membership
            .get_alive_members()
            .into_iter()
            .map(|node| node.id)
            .collect();
        node_ids.sort();
        node_ids
    }
}

fn owner_among(partition: u32, node_ids: &[NodeId]) -> Option<NodeId> {
    if node_ids.is_empty() {
        return None;
    }
    let idx = (partition as usize) % node_ids.len();
    Some(node_ids[idx].clone())
}
