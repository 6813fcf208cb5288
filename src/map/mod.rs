//! Map Module
//!
//! The user-facing partitioned map and everything that runs on the owner of a
//! key.
//!
//! ## Submodules
//! - **`proxy`**: `DistributedMap`, routing each key to the member that owns its partition.
//! - **`dispatcher`**: `MapContainer`, one member's copy of a map; runs the interceptor chain and publishes events.
//! - **`definition`**: Cluster-wide per-map state (factory, event bus, loader) and `MapOptions`.
//! - **`events`**: Entry listeners, each fed from its own queue.
//! - **`loader`**: The `MapLoader` contract and its batching adapter.
//! - **`processor`**: Entry processors and the `MutableEntry` they mutate.

pub mod definition;
pub mod dispatcher;
pub mod events;
pub mod loader;
pub mod processor;
pub mod proxy;
pub mod types;

#[cfg(test)]
mod tests;
