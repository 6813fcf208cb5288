use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;

/// Opaque identifier handed out when an interceptor is registered on a map.
///
/// The same id names the interceptor on every member, so a removal issued on
/// one member removes every copy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct InterceptorId(pub String);

impl InterceptorId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for InterceptorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InterceptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Failure raised from inside an interceptor callback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct InterceptorError {
    pub reason: String,
}

impl InterceptorError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Decision of a single `intercept_remove` step.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoveOutcome<V> {
    /// Let the removal continue, handing this value to the next interceptor.
    Proceed(V),
    /// Reject the removal. The entry keeps its stored value.
    Veto { reason: String },
}

impl<V> RemoveOutcome<V> {
    /// Shorthand for `Proceed(value)`.
    pub fn proceed(value: V) -> Self {
        RemoveOutcome::Proceed(value)
    }

    /// Shorthand for `Veto { reason }`.
    pub fn veto(reason: impl Into<String>) -> Self {
        RemoveOutcome::Veto {
            reason: reason.into(),
        }
    }
}

/// A value transformer invoked around every read, write and removal of a map.
///
/// Every hook defaults to identity (for `intercept_*`) or no-op (for
/// `after_*`), so implementations only override what they change.
///
/// Callbacks run on the partition that owns the key while that partition is
/// locked. They must not block.
pub trait MapInterceptor<V>: Send + Sync {
    /// Transforms a stored value on its way out. Never called for absent keys.
    fn intercept_get(&self, value: V) -> Result<V, InterceptorError> {
        Ok(value)
    }

    /// Notified with the final read value. Failures are logged, not surfaced.
    fn after_get(&self, _value: &V) -> Result<(), InterceptorError> {
        Ok(())
    }

    /// Transforms a value before it is stored. `old` is the value stored
    /// before the operation started.
    fn intercept_put(&self, _old: Option<&V>, new: V) -> Result<V, InterceptorError> {
        Ok(new)
    }

    /// Notified with the stored value once the write committed.
    fn after_put(&self, _value: &V) -> Result<(), InterceptorError> {
        Ok(())
    }

    /// Transforms or vetoes the value being removed.
    fn intercept_remove(&self, removed: V) -> Result<RemoveOutcome<V>, InterceptorError> {
        Ok(RemoveOutcome::Proceed(removed))
    }

    /// Notified with the removed value once the removal committed.
    fn after_remove(&self, _value: &V) -> Result<(), InterceptorError> {
        Ok(())
    }
}

/// Serialization contract for interceptors that travel between members.
///
/// `KIND` names the concrete type on the wire; the receiving member looks it
/// up in the map's `InterceptorFactory`.
pub trait Transportable: Serialize + DeserializeOwned {
    const KIND: &'static str;
}
