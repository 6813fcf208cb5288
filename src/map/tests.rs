//! Map Module Tests
//!
//! Exercises one member's `MapContainer` directly, without routing.
//!
//! ## Test Scopes
//! - **Dispatcher**: Chain placement around the store, returned values, veto semantics.
//! - **Events**: Notifications carry post-chain values; vetoes and suppressed loads publish nothing.
//! - **Processors**: Mutations made by entry processors replay through the chain.
//! - **Loader**: Batching and partial failures of the source adapter.

#[cfg(test)]
mod tests {
    use crate::error::LoaderError;
    use crate::interceptor::builtin::{GuardInterceptor, SuffixInterceptor, UppercaseInterceptor};
    use crate::interceptor::factory::{InterceptorFactory, InterceptorHandle};
    use crate::interceptor::types::{InterceptorError, MapInterceptor, RemoveOutcome, Transportable};
    use crate::map::dispatcher::MapContainer;
    use crate::map::events::{EntryListener, MapEventBus};
    use crate::map::loader::{LoaderAdapter, MapLoader};
    use crate::map::processor::{EntryProcessor, MutableEntry};
    use crate::map::types::{EntryEvent, EntryEventType};
    use crate::membership::types::NodeId;

    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    const P: u32 = 3;

    type Events = mpsc::UnboundedReceiver<EntryEvent<i32, String>>;

    struct RecordingListener {
        sender: mpsc::UnboundedSender<EntryEvent<i32, String>>,
    }

    impl EntryListener<i32, String> for RecordingListener {
        fn entry_added(&self, event: &EntryEvent<i32, String>) {
            let _ = self.sender.send(event.clone());
        }

        fn entry_updated(&self, event: &EntryEvent<i32, String>) {
            let _ = self.sender.send(event.clone());
        }

        fn entry_removed(&self, event: &EntryEvent<i32, String>) {
            let _ = self.sender.send(event.clone());
        }
    }

    /// Rewrites the value on its way out of the map.
    #[derive(Serialize, Deserialize)]
    struct TombstoneInterceptor;

    impl Transportable for TombstoneInterceptor {
        const KIND: &'static str = "tombstone";
    }

    impl MapInterceptor<String> for TombstoneInterceptor {
        fn intercept_remove(&self, removed: String) -> Result<RemoveOutcome<String>, InterceptorError> {
            Ok(RemoveOutcome::proceed(format!("{}-gone", removed)))
        }
    }

    /// Panics on key 1, records everything else.
    struct BrittleListener {
        sender: mpsc::UnboundedSender<EntryEvent<i32, String>>,
    }

    impl EntryListener<i32, String> for BrittleListener {
        fn entry_added(&self, event: &EntryEvent<i32, String>) {
            if event.key == 1 {
                panic!("listener cannot handle key 1");
            }
            let _ = self.sender.send(event.clone());
        }
    }

    struct SetValue(&'static str);

    impl EntryProcessor<i32, String> for SetValue {
        type Output = Option<String>;

        fn process(&self, entry: &mut MutableEntry<i32, String>) -> Option<String> {
            entry.set_value(self.0.to_string())
        }
    }

    struct RemoveEntry;

    impl EntryProcessor<i32, String> for RemoveEntry {
        type Output = Option<String>;

        fn process(&self, entry: &mut MutableEntry<i32, String>) -> Option<String> {
            entry.remove()
        }
    }

    struct ReadValue;

    impl EntryProcessor<i32, String> for ReadValue {
        type Output = Option<String>;

        fn process(&self, entry: &mut MutableEntry<i32, String>) -> Option<String> {
            entry.value().cloned()
        }
    }

    struct FlakyLoader;

    #[async_trait]
    impl MapLoader<i32, String> for FlakyLoader {
        async fn load(&self, key: &i32) -> anyhow::Result<Option<String>> {
            if *key == 3 {
                anyhow::bail!("source offline for key {}", key);
            }
            if *key > 100 {
                return Ok(None);
            }
            Ok(Some(format!("value-{}", key)))
        }
    }

    fn container() -> (MapContainer<i32, String>, Arc<MapEventBus<i32, String>>) {
        let events = MapEventBus::new();
        let container = MapContainer::new(
            "cities",
            NodeId("member-a".to_string()),
            8,
            InterceptorFactory::new(),
            events.clone(),
        );
        (container, events)
    }

    fn listen(events: &MapEventBus<i32, String>) -> Events {
        let (sender, receiver) = mpsc::unbounded_channel();
        events.add_listener(Arc::new(RecordingListener { sender }));
        receiver
    }

    async fn next_event(events: &mut Events) -> EntryEvent<i32, String> {
        tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("listener channel closed")
    }

    async fn assert_no_event(events: &mut Events) {
        let received = tokio::time::timeout(Duration::from_millis(100), events.recv()).await;
        assert!(received.is_err(), "unexpected event: {:?}", received);
    }

    // ============================================================
    // DISPATCHER TESTS
    // ============================================================

    #[tokio::test]
    async fn test_put_stores_chain_output_and_get_decorates_it() {
        let (map, _events) = container();
        map.registry().register(InterceptorHandle::new(UppercaseInterceptor)).unwrap();
        map.registry()
            .register(InterceptorHandle::new(SuffixInterceptor {
                suffix: ":".to_string(),
            }))
            .unwrap();

        assert_eq!(map.put(P, 2, "Istanbul".to_string()).unwrap(), None);

        assert_eq!(map.get(P, &2).unwrap(), Some("ISTANBUL:".to_string()));
        // Raw previous value, not the get-decorated one
        assert_eq!(
            map.put(P, 2, "Ankara".to_string()).unwrap(),
            Some("ISTANBUL".to_string())
        );
    }

    #[tokio::test]
    async fn test_get_of_absent_key_is_none() {
        let (map, _events) = container();
        map.registry()
            .register(InterceptorHandle::new(SuffixInterceptor {
                suffix: ":".to_string(),
            }))
            .unwrap();

        assert_eq!(map.get(P, &99).unwrap(), None);
    }

    #[tokio::test]
    async fn test_vetoed_remove_keeps_entry_and_publishes_nothing() {
        // ARRANGE
        let (map, events) = container();
        let mut received = listen(&events);
        map.registry()
            .register(InterceptorHandle::new(GuardInterceptor::protecting(["ISTANBUL"])))
            .unwrap();
        map.put(P, 2, "ISTANBUL".to_string()).unwrap();
        assert_eq!(next_event(&mut received).await.event_type, EntryEventType::Added);

        // ACT
        let result = map.remove(P, &2);

        // ASSERT
        assert!(result.unwrap_err().is_veto());
        assert_eq!(map.get(P, &2).unwrap(), Some("ISTANBUL".to_string()));
        assert_eq!(map.size(), 1);
        assert_no_event(&mut received).await;
    }

    #[tokio::test]
    async fn test_remove_of_absent_key_returns_none() {
        let (map, _events) = container();
        map.registry()
            .register(InterceptorHandle::new(TombstoneInterceptor))
            .unwrap();

        assert_eq!(map.remove(P, &7).unwrap(), None);
    }

    // ============================================================
    // EVENT TESTS
    // ============================================================

    #[tokio::test]
    async fn test_put_events_carry_stored_value() {
        let (map, events) = container();
        let mut received = listen(&events);
        map.registry().register(InterceptorHandle::new(UppercaseInterceptor)).unwrap();

        map.put(P, 1, "foo".to_string()).unwrap();
        map.put(P, 1, "bar".to_string()).unwrap();

        let added = next_event(&mut received).await;
        assert_eq!(added.event_type, EntryEventType::Added);
        assert_eq!(added.value.as_deref(), Some("FOO"));
        assert_eq!(added.old_value, None);
        assert_eq!(added.member, NodeId("member-a".to_string()));

        let updated = next_event(&mut received).await;
        assert_eq!(updated.event_type, EntryEventType::Updated);
        assert_eq!(updated.value.as_deref(), Some("BAR"));
        assert_eq!(updated.old_value.as_deref(), Some("FOO"));
    }

    #[tokio::test]
    async fn test_remove_event_carries_remove_chain_output() {
        let (map, events) = container();
        map.registry()
            .register(InterceptorHandle::new(TombstoneInterceptor))
            .unwrap();
        map.put(P, 4, "Moscow".to_string()).unwrap();
        let mut received = listen(&events);

        let removed = map.remove(P, &4).unwrap();

        assert_eq!(removed.as_deref(), Some("Moscow-gone"));
        let event = next_event(&mut received).await;
        assert_eq!(event.event_type, EntryEventType::Removed);
        assert_eq!(event.value, None);
        assert_eq!(event.old_value.as_deref(), Some("Moscow-gone"));
        assert!(!map.contains_key(P, &4));
    }

    #[tokio::test]
    async fn test_loaded_values_respect_publish_flag() {
        let (map, events) = container();
        let mut received = listen(&events);
        map.registry().register(InterceptorHandle::new(UppercaseInterceptor)).unwrap();

        assert!(map.put_loaded(P, 1, "quiet".to_string(), false, false).unwrap());
        assert_no_event(&mut received).await;

        assert!(map.put_loaded(P, 2, "loud".to_string(), false, true).unwrap());
        let event = next_event(&mut received).await;
        assert_eq!(event.key, 2);
        assert_eq!(event.value.as_deref(), Some("LOUD"));

        assert_eq!(map.get(P, &1).unwrap(), Some("QUIET".to_string()));
    }

    #[tokio::test]
    async fn test_put_loaded_without_replace_keeps_existing_value() {
        let (map, _events) = container();
        map.put(P, 1, "original".to_string()).unwrap();

        assert!(!map.put_loaded(P, 1, "loaded".to_string(), false, false).unwrap());
        assert_eq!(map.get(P, &1).unwrap(), Some("original".to_string()));

        assert!(map.put_loaded(P, 1, "loaded".to_string(), true, false).unwrap());
        assert_eq!(map.get(P, &1).unwrap(), Some("loaded".to_string()));
    }

    #[tokio::test]
    async fn test_removed_listener_stops_receiving() {
        let (map, events) = container();
        let (sender, mut received) = mpsc::unbounded_channel();
        let id = events.add_listener(Arc::new(RecordingListener { sender }));

        assert!(events.remove_listener(&id));
        map.put(P, 1, "x".to_string()).unwrap();

        let outcome = tokio::time::timeout(Duration::from_millis(100), received.recv()).await;
        // Aborting the task drops the sender: either closed or silent
        assert!(matches!(outcome, Ok(None) | Err(_)));
        assert_eq!(events.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_publish_burst_reaches_listener_in_order() {
        // ARRANGE
        let (map, events) = container();
        let mut received = listen(&events);

        // ACT: far more events than the listener can drain before yielding
        for key in 0..5000 {
            map.put_loaded(P, key, format!("v{}", key), false, true).unwrap();
        }

        // ASSERT
        for key in 0..5000 {
            let event = next_event(&mut received).await;
            assert_eq!(event.key, key);
        }
        assert_no_event(&mut received).await;
    }

    #[tokio::test]
    async fn test_panicking_listener_keeps_receiving() {
        // ARRANGE
        let (map, events) = container();
        let (sender, mut received) = mpsc::unbounded_channel();
        events.add_listener(Arc::new(BrittleListener { sender }));

        // ACT
        map.put(P, 1, "boom".to_string()).unwrap();
        map.put(P, 2, "fine".to_string()).unwrap();

        // ASSERT
        let event = next_event(&mut received).await;
        assert_eq!(event.key, 2);
        assert_eq!(events.listener_count(), 1);
    }

    // ============================================================
    // ENTRY PROCESSOR TESTS
    // ============================================================

    #[tokio::test]
    async fn test_processor_set_value_runs_put_chain() {
        let (map, events) = container();
        let mut received = listen(&events);
        map.registry().register(InterceptorHandle::new(UppercaseInterceptor)).unwrap();

        let previous = map.execute_on_key(P, 8, &SetValue("moscow")).unwrap();

        assert_eq!(previous, None);
        assert_eq!(map.get(P, &8).unwrap(), Some("MOSCOW".to_string()));
        let event = next_event(&mut received).await;
        assert_eq!(event.event_type, EntryEventType::Added);
        assert_eq!(event.value.as_deref(), Some("MOSCOW"));
    }

    #[tokio::test]
    async fn test_processor_remove_can_be_vetoed() {
        let (map, _events) = container();
        map.registry()
            .register(InterceptorHandle::new(GuardInterceptor::protecting(["keep"])))
            .unwrap();
        map.put(P, 1, "keep".to_string()).unwrap();

        let result = map.execute_on_key(P, 1, &RemoveEntry);

        assert!(result.unwrap_err().is_veto());
        assert_eq!(map.get(P, &1).unwrap(), Some("keep".to_string()));
    }

    #[tokio::test]
    async fn test_processor_without_mutation_publishes_nothing() {
        let (map, events) = container();
        map.put(P, 1, "seen".to_string()).unwrap();
        let mut received = listen(&events);

        let output = map.execute_on_key(P, 1, &ReadValue).unwrap();

        assert_eq!(output.as_deref(), Some("seen"));
        assert_no_event(&mut received).await;
    }

    #[test]
    fn test_mutable_entry_tracks_own_changes() {
        let mut entry = MutableEntry::new(1, Some("a".to_string()));

        assert_eq!(entry.set_value("b".to_string()), Some("a".to_string()));
        assert_eq!(entry.value().map(String::as_str), Some("b"));
        assert_eq!(entry.remove(), Some("b".to_string()));
        assert_eq!(entry.value(), None);
        assert_eq!(entry.key(), &1);
    }

    #[tokio::test]
    async fn test_destroy_clears_records_and_chain() {
        let (map, _events) = container();
        map.registry().register(InterceptorHandle::new(UppercaseInterceptor)).unwrap();
        map.put(P, 1, "x".to_string()).unwrap();

        map.destroy();

        assert_eq!(map.member(), &NodeId("member-a".to_string()));
        assert_eq!(map.size(), 0);
        assert!(map.registry().is_destroyed());
        assert!(map.registry().is_empty());
    }

    // ============================================================
    // LOADER TESTS
    // ============================================================

    #[tokio::test]
    async fn test_failing_batch_does_not_stop_others() {
        let adapter = LoaderAdapter::new(Arc::new(FlakyLoader), 2);

        let batches = adapter.load_batches(&[1, 2, 3, 4, 5, 101]).await;

        let mut loaded: Vec<i32> = batches.loaded.iter().map(|(k, _)| *k).collect();
        loaded.sort();
        assert_eq!(loaded, vec![1, 2, 5]);
        assert_eq!(batches.failed_keys, 2);
        assert!(matches!(
            batches.failures.as_slice(),
            [LoaderError::Failed { keys: 2, .. }]
        ));
    }

    #[tokio::test]
    async fn test_single_load_maps_errors() {
        let adapter = LoaderAdapter::new(Arc::new(FlakyLoader), 10);

        assert_eq!(adapter.load(&1).await.unwrap().as_deref(), Some("value-1"));
        assert_eq!(adapter.load(&500).await.unwrap(), None);
        assert!(matches!(adapter.load(&3).await, Err(LoaderError::Failed { keys: 1, .. })));
        assert_eq!(adapter.load_all_keys().await.unwrap(), None);
    }
}
