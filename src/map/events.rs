//! Entry change notifications.
//!
//! Every member's copy of a map publishes into one shared bus. Each
//! registered listener owns an unbounded queue drained by its own spawned
//! task, so delivery is asynchronous to the operation that caused it and no
//! event is dropped for a slow listener. A listener registered before an
//! operation starts is in the bus before the event is queued and therefore
//! observes it. Per listener, events arrive in publish order.

use super::types::{EntryEvent, EntryEventType, ListenerId};

use dashmap::DashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub trait EntryListener<K, V>: Send + Sync {
    fn entry_added(&self, _event: &EntryEvent<K, V>) {}
    fn entry_updated(&self, _event: &EntryEvent<K, V>) {}
    fn entry_removed(&self, _event: &EntryEvent<K, V>) {}
}

struct ListenerSlot<K, V> {
    queue: mpsc::UnboundedSender<EntryEvent<K, V>>,
    task: JoinHandle<()>,
}

pub struct MapEventBus<K, V> {
    listeners: DashMap<ListenerId, ListenerSlot<K, V>>,
}

impl<K, V> MapEventBus<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            listeners: DashMap::new(),
        })
    }

    /// Queues an event for every listener. Never blocks.
    pub fn publish(&self, event: EntryEvent<K, V>) {
        if self.listeners.is_empty() {
            return;
        }
        tracing::trace!("Publishing {:?} event on map '{}'", event.event_type, event.map_name);

        let mut closed = Vec::new();
        for slot in self.listeners.iter() {
            if slot.queue.send(event.clone()).is_err() {
                closed.push(slot.key().clone());
            }
        }

        for id in closed {
            tracing::warn!("Listener {} stopped, unregistering it", id);
            self.listeners.remove(&id);
        }
    }

    /// Subscribes a listener. Must be called from within a Tokio runtime.
    pub fn add_listener(&self, listener: Arc<dyn EntryListener<K, V>>) -> ListenerId {
        let id = ListenerId::new();
        let (queue, mut receiver) = mpsc::unbounded_channel::<EntryEvent<K, V>>();
        let task_id = id.clone();

        let task = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                let outcome = catch_unwind(AssertUnwindSafe(|| dispatch(listener.as_ref(), &event)));
                if outcome.is_err() {
                    tracing::warn!(
                        "Listener {} panicked on {:?} event of map '{}'",
                        task_id,
                        event.event_type,
                        event.map_name
                    );
                }
            }
        });

        self.listeners.insert(id.clone(), ListenerSlot { queue, task });
        tracing::debug!("Registered entry listener {}", id);
        id
    }

    pub fn remove_listener(&self, id: &ListenerId) -> bool {
        match self.listeners.remove(id) {
            Some((_, slot)) => {
                slot.task.abort();
                true
            }
            None => false,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn clear(&self) {
        self.listeners.retain(|_, slot| {
            slot.task.abort();
            false
        });
    }
}

fn dispatch<K, V>(listener: &dyn EntryListener<K, V>, event: &EntryEvent<K, V>) {
    match event.event_type {
        EntryEventType::Added => listener.entry_added(event),
        EntryEventType::Updated => listener.entry_updated(event),
        EntryEventType::Removed => listener.entry_removed(event),
    }
}
