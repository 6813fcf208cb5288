//! Membership Module
//!
//! Tracks which members form the cluster and in which order they joined.
//!
//! ## Core Mechanisms
//! - **Join lifecycle**: Members enter as `Joining` while they receive cluster state and are only
//!   promoted to `Alive` (and thus to partition owners) once that transfer succeeded.
//! - **Seniority**: The join sequence orders members; the oldest alive member is the state-transfer source.

pub mod service;
pub mod types;
