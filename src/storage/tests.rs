//! Storage Module Tests
//!
//! Validates the data distribution logic and local storage mechanics.
//!
//! ## Test Scopes
//! - **Partitioner**: Ensures deterministic hashing, fair distribution and stable ownership.
//! - **RecordStore**: Verifies per-partition storage and migration helpers.

#[cfg(test)]
mod tests {
    use crate::membership::service::MembershipService;
    use crate::storage::partitioner::PartitionManager;
    use crate::storage::record_store::RecordStore;
    use std::collections::HashMap;

    fn single_member() -> (std::sync::Arc<MembershipService>, crate::membership::types::NodeId) {
        let membership = MembershipService::new();
        let node = membership.begin_join();
        membership.activate(&node.id);
        (membership, node.id)
    }

    // ============================================================
    // PARTITIONER TESTS
    // ============================================================

    #[test]
    fn test_partition_is_deterministic() {
        let (membership, _) = single_member();
        let partitioner = PartitionManager::new(membership, 256);

        let p1 = partitioner.get_partition("book_100");
        let p2 = partitioner.get_partition("book_100");
        assert_eq!(p1, p2, "The same value should yield the same partition");
    }

    #[test]
    fn test_partition_is_within_range() {
        let (membership, _) = single_member();
        let partitioner = PartitionManager::new(membership, 256);

        for i in 0..1000 {
            let partition = partitioner.get_partition(&i);
            assert!(
                partition < partitioner.num_partitions,
                "Partition {} should be < {}",
                partition,
                partitioner.num_partitions
            );
        }
    }

    #[test]
    fn test_partition_distribution() {
        let (membership, _) = single_member();
        let partitioner = PartitionManager::new(membership, 256);

        let mut partition_counts = HashMap::new();
        for i in 0..10000 {
            let key = format!("book_{}", i);
            *partition_counts.entry(partitioner.get_partition(&key)).or_insert(0) += 1;
        }

        assert!(
            partition_counts.len() > 100,
            "Should have more than 100 distinct partitions used, got: {}",
            partition_counts.len()
        );
    }

    #[test]
    fn test_no_owner_without_alive_members() {
        let membership = MembershipService::new();
        membership.begin_join();
        let partitioner = PartitionManager::new(membership, 8);

        assert!(partitioner.get_owner(0).is_none());
        assert!(partitioner.partition_table().iter().all(Option::is_none));
    }

    #[test]
    fn test_single_member_owns_everything() {
        let (membership, node_id) = single_member();
        let partitioner = PartitionManager::new(membership, 32);

        assert!(partitioner.partition_table().iter().all(|owner| owner.as_ref() == Some(&node_id)));
        assert_eq!(partitioner.get_owner(5), Some(node_id));
    }

    #[test]
    fn test_ownership_split_between_two_members() {
        let (membership, first) = single_member();
        let second = membership.begin_join();
        membership.activate(&second.id);
        let partitioner = PartitionManager::new(membership, 32);

        let table = partitioner.partition_table();
        let mine = table.iter().filter(|owner| owner.as_ref() == Some(&first)).count();
        let theirs = table.iter().filter(|owner| owner.as_ref() == Some(&second.id)).count();

        assert_eq!(mine + theirs, 32);
        assert_eq!(mine, 16);
    }

    // ============================================================
    // RECORD STORE TESTS
    // ============================================================

    #[test]
    fn test_store_and_get() {
        let store: RecordStore<String, String> = RecordStore::new(4);

        store.with_partition(1, |records| {
            records.insert("k".to_string(), "v".to_string());
        });

        assert_eq!(store.get(1, &"k".to_string()), Some("v".to_string()));
        assert!(store.contains_key(1, &"k".to_string()));
        assert_eq!(store.get(2, &"k".to_string()), None, "partitions are isolated");
    }

    #[test]
    fn test_size_counts_all_partitions() {
        let store: RecordStore<u32, u32> = RecordStore::new(4);

        for i in 0..20u32 {
            store.with_partition(i % 4, |records| {
                records.insert(i, i * 10);
            });
        }

        assert_eq!(store.size(), 20);
        assert_eq!(store.partition_size(0), 5);
    }

    #[test]
    fn test_drain_and_apply_moves_partition() {
        let source: RecordStore<u32, String> = RecordStore::new(2);
        let target: RecordStore<u32, String> = RecordStore::new(2);
        source.apply_partition_entries(1, vec![(1, "a".to_string()), (3, "b".to_string())]);

        let moved = source.drain_partition(1);
        target.apply_partition_entries(1, moved);

        assert_eq!(source.partition_size(1), 0);
        assert_eq!(target.partition_size(1), 2);
        assert_eq!(target.get(1, &3), Some("b".to_string()));
    }

    #[test]
    fn test_clear() {
        let store: RecordStore<u32, u32> = RecordStore::new(2);
        store.apply_partition_entries(0, vec![(1, 1)]);
        store.apply_partition_entries(1, vec![(2, 2)]);

        store.clear();

        assert_eq!(store.size(), 0);
    }
}
