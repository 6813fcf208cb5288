//! In-process cluster and member handles.
//!
//! Every member keeps one `MapContainer` per map in the shared directory.
//! Topology changes (joins, map destruction) hold the topology lock for
//! writing; registry mutations and map operations hold it for reading, so an
//! interceptor is never added halfway through a join.

use super::migration;
use super::propagation;
use super::protocol::{KeyValueJson, RegistryTransfer, TransferredInterceptor};
use crate::config::ClusterConfig;
use crate::error::{MapError, Result, TransportError};
use crate::map::definition::{MapDefinition, MapOptions};
use crate::map::dispatcher::MapContainer;
use crate::map::proxy::DistributedMap;
use crate::map::types::{MapKey, MapValue};
use crate::membership::service::MembershipService;
use crate::membership::types::{Node, NodeId};
use crate::storage::partitioner::PartitionManager;

use dashmap::DashMap;
use std::any::Any;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Type-erased view of one member's container, used where the cluster handles
/// maps of any key/value type alike.
pub(crate) trait ManagedContainer: Send + Sync {
    fn map_name(&self) -> &str;
    fn export_registry(&self) -> Result<RegistryTransfer, TransportError>;
    /// Installs transferred interceptors; returns how many were new.
    fn import_registry(&self, transfer: &RegistryTransfer) -> Result<usize>;
    fn migrate_out(&self, partition: u32) -> Result<Vec<KeyValueJson>>;
    fn migrate_in(&self, partition: u32, entries: Vec<KeyValueJson>) -> Result<()>;
    fn entry_count(&self) -> usize;
    fn destroy(&self);
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

pub(crate) trait ManagedDefinition: Send + Sync {
    fn map_name(&self) -> &str;
    fn container_for(&self, member: &NodeId) -> Arc<dyn ManagedContainer>;
    fn shutdown(&self);
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<K: MapKey, V: MapValue> ManagedContainer for MapContainer<K, V> {
    fn map_name(&self) -> &str {
        self.name()
    }

    fn export_registry(&self) -> Result<RegistryTransfer, TransportError> {
        let entries = self
            .registry()
            .snapshot()
            .iter()
            .map(|entry| -> Result<TransferredInterceptor, TransportError> {
                Ok(TransferredInterceptor {
                    id: entry.id.clone(),
                    kind: entry.handle.kind().to_string(),
                    state_json: entry.handle.encode(&entry.id)?,
                })
            })
            .collect::<Result<Vec<_>, TransportError>>()?;

        Ok(RegistryTransfer {
            map_name: self.name().to_string(),
            entries,
        })
    }

    fn import_registry(&self, transfer: &RegistryTransfer) -> Result<usize> {
        let mut installed = 0;
        for entry in &transfer.entries {
            let handle = self.factory().decode(&entry.id, &entry.kind, &entry.state_json)?;
            if self.registry().register_with_id(entry.id.clone(), handle)? {
                installed += 1;
            }
        }
        Ok(installed)
    }

    fn migrate_out(&self, partition: u32) -> Result<Vec<KeyValueJson>> {
        let records = self.drain_partition(partition);
        let encoded = records
            .iter()
            .map(|(key, value)| -> Result<KeyValueJson, serde_json::Error> {
                Ok(KeyValueJson {
                    key_json: serde_json::to_string(key)?,
                    value_json: serde_json::to_string(value)?,
                })
            })
            .collect::<Result<Vec<_>, serde_json::Error>>();

        match encoded {
            Ok(entries) => Ok(entries),
            Err(e) => {
                self.apply_partition_entries(partition, records);
                Err(MapError::Serialization(e.to_string()))
            }
        }
    }

    fn migrate_in(&self, partition: u32, entries: Vec<KeyValueJson>) -> Result<()> {
        let records = entries
            .iter()
            .map(|entry| -> Result<(K, V), serde_json::Error> {
                Ok((
                    serde_json::from_str::<K>(&entry.key_json)?,
                    serde_json::from_str::<V>(&entry.value_json)?,
                ))
            })
            .collect::<Result<Vec<_>, serde_json::Error>>()
            .map_err(|e| MapError::Serialization(e.to_string()))?;

        self.apply_partition_entries(partition, records);
        Ok(())
    }

    fn entry_count(&self) -> usize {
        self.size()
    }

    fn destroy(&self) {
        MapContainer::destroy(self);
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl<K: MapKey, V: MapValue> ManagedDefinition for MapDefinition<K, V> {
    fn map_name(&self) -> &str {
        &self.name
    }

    fn container_for(&self, member: &NodeId) -> Arc<dyn ManagedContainer> {
        Arc::new(self.create_container(member))
    }

    fn shutdown(&self) {
        self.events.clear();
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// State shared by the cluster and every member handle.
pub(crate) struct ClusterShared {
    pub(crate) config: ClusterConfig,
    pub(crate) membership: Arc<MembershipService>,
    pub(crate) partitioner: Arc<PartitionManager>,
    pub(crate) topology: RwLock<()>,
    directory: DashMap<NodeId, DashMap<String, Arc<dyn ManagedContainer>>>,
    definitions: DashMap<String, Arc<dyn ManagedDefinition>>,
}

impl ClusterShared {
    fn new(config: ClusterConfig) -> Self {
        let membership = MembershipService::new();
        let partitioner = PartitionManager::new(membership.clone(), config.partition_count);
        Self {
            config,
            membership,
            partitioner,
            topology: RwLock::new(()),
            directory: DashMap::new(),
            definitions: DashMap::new(),
        }
    }

    pub(crate) fn container(&self, member: &NodeId, map_name: &str) -> Option<Arc<dyn ManagedContainer>> {
        self.directory
            .get(member)?
            .get(map_name)
            .map(|entry| entry.value().clone())
    }

    pub(crate) fn typed_container<K: MapKey, V: MapValue>(
        &self,
        member: &NodeId,
        map_name: &str,
    ) -> Result<Arc<MapContainer<K, V>>> {
        if !self.directory.contains_key(member) {
            return Err(MapError::UnknownMember(member.to_string()));
        }
        let container = self
            .container(member, map_name)
            .ok_or_else(|| MapError::Destroyed(map_name.to_string()))?;

        container
            .as_any()
            .downcast::<MapContainer<K, V>>()
            .map_err(|_| MapError::TypeMismatch {
                name: map_name.to_string(),
            })
    }

    pub(crate) fn insert_container(&self, member: &NodeId, container: Arc<dyn ManagedContainer>) {
        if let Some(containers) = self.directory.get(member) {
            containers.insert(container.map_name().to_string(), container);
        }
    }

    pub(crate) fn definitions(&self) -> Vec<Arc<dyn ManagedDefinition>> {
        self.definitions
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub(crate) fn map_names(&self) -> Vec<String> {
        self.definitions
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Entries held by one member across all maps.
    pub(crate) fn member_entry_count(&self, member: &NodeId) -> usize {
        self.directory
            .get(member)
            .map(|containers| {
                containers
                    .iter()
                    .map(|entry| entry.value().entry_count())
                    .sum()
            })
            .unwrap_or(0)
    }

    fn definition_for<K: MapKey, V: MapValue>(
        &self,
        name: &str,
        options: MapOptions<K, V>,
    ) -> Result<Arc<MapDefinition<K, V>>> {
        let has_loader = options.loader.is_some();
        let mut created = false;

        let definition = self
            .definitions
            .entry(name.to_string())
            .or_insert_with(|| {
                created = true;
                let definition: Arc<dyn ManagedDefinition> =
                    Arc::new(MapDefinition::new(name, &self.config, options));
                definition
            })
            .value()
            .clone();

        if created {
            tracing::info!("Created map '{}'", name);
        } else if has_loader {
            tracing::warn!("Map '{}' already exists, supplied loader ignored", name);
        }

        self.ensure_containers(definition.as_ref());

        definition
            .as_any()
            .downcast::<MapDefinition<K, V>>()
            .map_err(|_| MapError::TypeMismatch {
                name: name.to_string(),
            })
    }

    fn ensure_containers(&self, definition: &dyn ManagedDefinition) {
        for member in self.membership.get_alive_members() {
            if let Some(containers) = self.directory.get(&member.id) {
                containers
                    .entry(definition.map_name().to_string())
                    .or_insert_with(|| definition.container_for(&member.id));
            }
        }
    }

    /// Drops a map everywhere. Caller holds the topology write lock.
    pub(crate) fn remove_map(&self, name: &str) -> bool {
        let Some((_, definition)) = self.definitions.remove(name) else {
            return false;
        };
        definition.shutdown();

        for containers in self.directory.iter() {
            if let Some((_, container)) = containers.value().remove(name) {
                container.destroy();
            }
        }
        true
    }
}

/// An in-process cluster of members sharing partitioned maps.
#[derive(Clone)]
pub struct Cluster {
    shared: Arc<ClusterShared>,
}

impl Cluster {
    /// Creates an empty cluster. Rejects configs that fail `validate`.
    pub fn new(config: ClusterConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| MapError::Config(e.to_string()))?;

        Ok(Self {
            shared: Arc::new(ClusterShared::new(config)),
        })
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.shared.config
    }

    /// Adds a member.
    ///
    /// The member stays `Joining` until every map's interceptor registry has
    /// been replayed onto it. If the replay fails the join is rolled back and
    /// the member never serves an operation. Partitions move to it afterwards.
    pub async fn join_node(&self) -> Result<ClusterNode> {
        let _topology = self.shared.topology.write().await;

        let node = self.shared.membership.begin_join();
        self.shared.directory.insert(node.id.clone(), DashMap::new());

        match propagation::replay_registries(&self.shared, &node.id) {
            Ok(replayed) => {
                tracing::info!("Replayed {} interceptor(s) onto {}", replayed, node.id);
            }
            Err(e) => {
                tracing::error!("Join of {} aborted: {}", node.id, e);
                self.shared.directory.remove(&node.id);
                self.shared.membership.remove_member(&node.id);
                return Err(e);
            }
        }

        let before = self.shared.partitioner.partition_table();
        self.shared.membership.activate(&node.id);
        let after = self.shared.partitioner.partition_table();
        let moved = migration::migrate_partitions(&self.shared, &before, &after);
        tracing::info!("Node {} joined, {} partition(s) moved", node.id, moved);

        Ok(ClusterNode {
            node_id: node.id,
            shared: self.shared.clone(),
        })
    }

    pub fn members(&self) -> Vec<Node> {
        self.shared.membership.get_alive_members()
    }

    pub fn node(&self, id: &NodeId) -> Option<ClusterNode> {
        self.shared.directory.contains_key(id).then(|| ClusterNode {
            node_id: id.clone(),
            shared: self.shared.clone(),
        })
    }
}

/// One member of a `Cluster`. Maps obtained through any member behave the
/// same; the member only determines which node is "local".
#[derive(Clone)]
pub struct ClusterNode {
    node_id: NodeId,
    shared: Arc<ClusterShared>,
}

impl ClusterNode {
    pub fn id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.shared.config
    }

    pub fn membership(&self) -> Arc<MembershipService> {
        self.shared.membership.clone()
    }

    pub async fn get_map<K: MapKey, V: MapValue>(&self, name: &str) -> Result<DistributedMap<K, V>> {
        self.get_map_with(name, MapOptions::default()).await
    }

    /// Obtains a map, creating it cluster-wide on first use. `options` only
    /// apply when this call creates the map.
    pub async fn get_map_with<K: MapKey, V: MapValue>(
        &self,
        name: &str,
        options: MapOptions<K, V>,
    ) -> Result<DistributedMap<K, V>> {
        let _topology = self.shared.topology.read().await;
        let definition = self.shared.definition_for(name, options)?;
        Ok(DistributedMap::new(
            definition,
            self.shared.clone(),
            self.node_id.clone(),
        ))
    }

    /// This member's registry for `map_name`, ready to send to another node.
    pub async fn export_registry(&self, map_name: &str) -> Result<RegistryTransfer> {
        let _topology = self.shared.topology.read().await;
        let container = self
            .shared
            .container(&self.node_id, map_name)
            .ok_or_else(|| MapError::Destroyed(map_name.to_string()))?;
        Ok(container.export_registry()?)
    }

    /// Installs a registry received from another node on this member only.
    pub async fn import_registry(&self, transfer: &RegistryTransfer) -> Result<usize> {
        let _topology = self.shared.topology.read().await;
        let container = self
            .shared
            .container(&self.node_id, &transfer.map_name)
            .ok_or_else(|| MapError::Destroyed(transfer.map_name.clone()))?;
        container.import_registry(transfer)
    }

    /// Entries this member owns across all maps.
    pub fn local_entry_count(&self) -> usize {
        self.shared.member_entry_count(&self.node_id)
    }
}
