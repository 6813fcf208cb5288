//! Cluster Propagation Adapter
//!
//! When a member joins, every map's interceptor registry is copied from the
//! oldest alive member onto it before it is allowed to serve. The copy goes
//! through the same path a remote member would see: each interceptor is
//! encoded, the registry is framed with bincode, and the joiner decodes it
//! through the map's interceptor factory. Ordering and ids are preserved.

use super::node::ClusterShared;
use super::protocol::RegistryTransfer;
use crate::error::Result;
use crate::membership::types::NodeId;

/// Creates the joiner's containers and replays every registry onto them.
/// Returns the number of interceptors installed.
pub(crate) fn replay_registries(shared: &ClusterShared, joiner: &NodeId) -> Result<usize> {
    let source = shared.membership.oldest_alive_member();
    let mut replayed = 0;

    for definition in shared.definitions() {
        let target = definition.container_for(joiner);
        shared.insert_container(joiner, target.clone());

        let Some(source) = source.as_ref() else {
            continue;
        };
        let Some(origin) = shared.container(&source.id, definition.map_name()) else {
            tracing::debug!(
                "Member {} has no container for map '{}', nothing to replay",
                source.id,
                definition.map_name()
            );
            continue;
        };

        let transfer = origin.export_registry()?;
        let frame = transfer.to_frame()?;
        let received = RegistryTransfer::from_frame(&frame)?;

        let installed = target.import_registry(&received)?;
        tracing::debug!(
            "Map '{}': replayed {} interceptor(s) from {} onto {} ({} bytes)",
            received.map_name,
            installed,
            source.id,
            joiner,
            frame.len()
        );
        replayed += installed;
    }

    Ok(replayed)
}
