//! Intercepted Cluster Library
//!
//! A partitioned in-memory map whose reads, writes and removals pass through
//! an ordered chain of user-supplied interceptors. The chain is replicated to
//! every member, including members that join later.
//!
//! ## Architecture Modules
//! - **`interceptor`**: The interceptor contract, the per-map registry and the pipeline folding it.
//! - **`map`**: The `DistributedMap` proxy, the owner-side dispatcher, listeners, loaders and
//!   entry processors.
//! - **`cluster`**: In-process members, join-time registry propagation, partition migration and
//!   the HTTP surface of the node binary.
//! - **`membership`**: Member lifecycle (`Joining` -> `Alive`) and seniority.
//! - **`storage`**: Partition placement and the per-partition record store.
//! - **`config`** / **`error`**: Runtime knobs and the error taxonomy.

pub mod cluster;
pub mod config;
pub mod error;
pub mod interceptor;
pub mod map;
pub mod membership;
pub mod storage;
