//! Partition hand-off after the member set changed.

use super::node::ClusterShared;
use crate::membership::types::NodeId;

/// Moves the records of every partition whose owner changed between the two
/// tables. Returns the number of partitions that changed owner.
pub(crate) fn migrate_partitions(
    shared: &ClusterShared,
    before: &[Option<NodeId>],
    after: &[Option<NodeId>],
) -> usize {
    let map_names = shared.map_names();
    let mut moved = 0;

    for (partition, (old_owner, new_owner)) in before.iter().zip(after).enumerate() {
        let (Some(old_owner), Some(new_owner)) = (old_owner, new_owner) else {
            continue;
        };
        if old_owner == new_owner {
            continue;
        }
        let partition = partition as u32;

        for name in &map_names {
            let (Some(source), Some(target)) = (
                shared.container(old_owner, name),
                shared.container(new_owner, name),
            ) else {
                continue;
            };

            let result = source.migrate_out(partition).and_then(|entries| {
                let count = entries.len();
                target.migrate_in(partition, entries).map(|_| count)
            });
            match result {
                Ok(0) => {}
                Ok(count) => tracing::debug!(
                    "Map '{}': moved {} record(s) of partition {} from {} to {}",
                    name,
                    count,
                    partition,
                    old_owner,
                    new_owner
                ),
                Err(e) => tracing::error!(
                    "Map '{}': failed to move partition {} to {}: {}",
                    name,
                    partition,
                    new_owner,
                    e
                ),
            }
        }
        moved += 1;
    }

    moved
}
