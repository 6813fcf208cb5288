use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NodeState {
    /// Receiving cluster state; not yet an owner of any partition.
    Joining,
    /// Serving operations.
    Alive,
}

/// Represents a single member in the cluster.
///
/// `join_seq` orders members by the time they joined; the member with the
/// lowest sequence among the alive ones is the source of state transfers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub http_addr: Option<SocketAddr>,
    pub state: NodeState,
    pub join_seq: u64,
}

impl Node {
    pub fn joining(join_seq: u64) -> Self {
        Self {
            id: NodeId::new(),
            http_addr: None,
            state: NodeState::Joining,
            join_seq,
        }
    }
}
