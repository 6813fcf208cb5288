use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::types::{Node, NodeId, NodeState};

/// Shared view of who belongs to the cluster.
///
/// Members enter as `Joining`, become `Alive` once their state transfer
/// finished, and only `Alive` members own partitions.
pub struct MembershipService {
    pub members: Arc<DashMap<NodeId, Node>>,
    next_join_seq: AtomicU64,
}

impl MembershipService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            members: Arc::new(DashMap::new()),
            next_join_seq: AtomicU64::new(0),
        })
    }

    /// Admits a new member in the `Joining` state.
    pub fn begin_join(&self) -> Node {
        let node = Node::joining(self.next_join_seq.fetch_add(1, Ordering::SeqCst));
        self.members.insert(node.id.clone(), node.clone());
        tracing::info!("Node {} joining cluster (seq={})", node.id, node.join_seq);
        node
    }

    /// Marks a joining member as able to serve operations.
    pub fn activate(&self, node_id: &NodeId) -> bool {
        let activated = match self.members.get_mut(node_id) {
            Some(mut member) => {
                member.state = NodeState::Alive;
                true
            }
            None => false,
        };

        if activated {
            tracing::info!("Cluster size now: {} alive nodes", self.get_alive_members().len());
        } else {
            tracing::debug!("Activate for unknown node {}", node_id);
        }
        activated
    }

    /// Drops a member, e.g. after its join failed.
    pub fn remove_member(&self, node_id: &NodeId) -> Option<Node> {
        self.members.remove(node_id).map(|(_, node)| node)
    }

    /// Alive members ordered by join sequence.
    pub fn get_alive_members(&self) -> Vec<Node> {
        let mut alive: Vec<Node> = self
            .members
            .iter()
            .filter(|entry| entry.value().state == NodeState::Alive)
            .map(|entry| entry.value().clone())
            .collect();
        alive.sort_by_key(|node| node.join_seq);
        alive
    }

    /// The longest-standing alive member.
    pub fn oldest_alive_member(&self) -> Option<Node> {
        self.get_alive_members().into_iter().next()
    }

    pub fn set_http_addr(&self, node_id: &NodeId, addr: std::net::SocketAddr) {
        if let Some(mut member) = self.members.get_mut(node_id) {
            member.http_addr = Some(addr);
        }
    }
}
