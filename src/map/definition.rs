use super::dispatcher::MapContainer;
use super::events::MapEventBus;
use super::loader::{LoaderAdapter, MapLoader};
use super::types::{MapKey, MapValue};
use crate::config::ClusterConfig;
use crate::interceptor::factory::InterceptorFactory;
use crate::membership::types::NodeId;

use std::sync::Arc;

/// Per-map settings supplied the first time a map is obtained.
pub struct MapOptions<K: MapKey, V: MapValue> {
    pub loader: Option<Arc<dyn MapLoader<K, V>>>,
    /// Overrides `ClusterConfig::load_all_publishes_add_event` for this map.
    pub load_all_publishes_add_event: Option<bool>,
}

impl<K: MapKey, V: MapValue> Default for MapOptions<K, V> {
    fn default() -> Self {
        Self {
            loader: None,
            load_all_publishes_add_event: None,
        }
    }
}

impl<K: MapKey, V: MapValue> MapOptions<K, V> {
    pub fn with_loader(mut self, loader: impl MapLoader<K, V> + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    pub fn with_load_all_publishes_add_event(mut self, publish: bool) -> Self {
        self.load_all_publishes_add_event = Some(publish);
        self
    }
}

/// Cluster-wide state of one map, shared by every member's container.
pub struct MapDefinition<K: MapKey, V: MapValue> {
    pub(crate) name: String,
    pub(crate) partition_count: u32,
    pub(crate) factory: Arc<InterceptorFactory<V>>,
    pub(crate) events: Arc<MapEventBus<K, V>>,
    pub(crate) loader: Option<LoaderAdapter<K, V>>,
    pub(crate) publish_load_events: bool,
}

impl<K: MapKey, V: MapValue> MapDefinition<K, V> {
    pub fn new(name: &str, config: &ClusterConfig, options: MapOptions<K, V>) -> Self {
        Self {
            name: name.to_string(),
            partition_count: config.partition_count,
            factory: InterceptorFactory::new(),
            events: MapEventBus::new(),
            loader: options
                .loader
                .map(|loader| LoaderAdapter::new(loader, config.loader_batch_size)),
            publish_load_events: options
                .load_all_publishes_add_event
                .unwrap_or(config.load_all_publishes_add_event),
        }
    }

    pub fn create_container(&self, member: &NodeId) -> MapContainer<K, V> {
        MapContainer::new(
            &self.name,
            member.clone(),
            self.partition_count,
            self.factory.clone(),
            self.events.clone(),
        )
    }
}
