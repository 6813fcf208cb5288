//! Storage Module
//!
//! Implements the partitioned in-memory store the interceptor pipeline wraps.
//!
//! ## Core Concepts
//! - **Partitioning**: Keys are hashed into a fixed number of partitions.
//! - **Placement**: `PartitionManager` assigns each partition to one alive member.
//! - **Serialization**: `RecordStore` locks per partition, so operations on one key never interleave.

pub mod partitioner;
pub mod record_store;

#[cfg(test)]
mod tests;
