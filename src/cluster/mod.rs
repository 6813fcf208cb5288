//! Cluster Module
//!
//! Members, membership changes and the state that has to travel with them.
//!
//! ## Core Mechanisms
//! - **Join**: A member receives every map's interceptor registry before it is marked alive.
//! - **Propagation**: Registries cross member boundaries as bincode frames of encoded interceptors.
//! - **Migration**: Partitions whose owner changed move their records as JSON.
//! - **HTTP**: `handlers` and `remote` expose string maps and let a node pull registries from a seed.

pub mod handlers;
mod migration;
pub mod node;
mod propagation;
pub mod protocol;
pub mod remote;
