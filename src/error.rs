//! Error types for the intercepted map.

use crate::interceptor::types::InterceptorId;

/// Convenience alias used across the library.
pub type Result<T, E = MapError> = std::result::Result<T, E>;

/// Top-level error returned by map operations.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Remove vetoed by interceptor {interceptor}: {reason}")]
    Veto {
        interceptor: InterceptorId,
        reason: String,
    },

    #[error("Interceptor {interceptor} failed: {reason}")]
    Interceptor {
        interceptor: InterceptorId,
        reason: String,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Loader error: {0}")]
    Loader(#[from] LoaderError),

    #[error("Map '{0}' is destroyed")]
    Destroyed(String),

    #[error("Map '{name}' already exists with different key/value types")]
    TypeMismatch { name: String },

    #[error("No owner for partition {0}")]
    NoOwner(u32),

    #[error("Unknown member: {0}")]
    UnknownMember(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid cluster configuration: {0}")]
    Config(String),
}

impl MapError {
    /// True when the error is an interceptor veto rather than a failure.
    pub fn is_veto(&self) -> bool {
        matches!(self, MapError::Veto { .. })
    }
}

/// Errors raised while moving interceptors between members.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Interceptor {id} of kind '{kind}' could not be encoded: {reason}")]
    Encode {
        id: InterceptorId,
        kind: String,
        reason: String,
    },

    #[error("Interceptor {id} of kind '{kind}' could not be decoded: {reason}")]
    Decode {
        id: InterceptorId,
        kind: String,
        reason: String,
    },

    #[error("No decoder registered for interceptor kind '{kind}'")]
    UnknownKind { kind: String },

    #[error("State transfer frame is invalid: {0}")]
    Frame(String),

    #[error("Member {member} unreachable: {reason}")]
    Unreachable { member: String, reason: String },
}

/// Errors raised by the external source adapter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoaderError {
    #[error("Loader failed for {keys} key(s): {reason}")]
    Failed { keys: usize, reason: String },

    #[error("Bulk load incomplete: {failed} of {requested} key(s) not loaded: {reason}")]
    Partial {
        requested: usize,
        failed: usize,
        reason: String,
    },
}
