//! Interceptor Module
//!
//! User-supplied value transformers that run on every read, write and removal
//! of a map.
//!
//! ## Submodules
//! - **`types`**: The `MapInterceptor` trait, ids, veto outcome and the `Transportable` contract.
//! - **`factory`**: Encoding of live interceptors and decoding of transferred ones, keyed by kind.
//! - **`registry`**: Copy-on-write ordered chain, snapshotted once per operation.
//! - **`pipeline`**: Stateless functions folding a snapshot around get/put/remove.
//! - **`builtin`**: Ready-made `String` interceptors used by the node binary.

pub mod builtin;
pub mod factory;
pub mod pipeline;
pub mod registry;
pub mod types;
