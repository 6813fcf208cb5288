//! Transformation Pipeline
//!
//! Stateless functions applying a registry snapshot around one operation.
//! Chains run in registration order; each interceptor's output is the next
//! one's input. `after_*` hooks all receive the final chain output.

use super::registry::RegistryEntry;
use super::types::{InterceptorError, InterceptorId, RemoveOutcome};
use crate::error::{MapError, Result};

/// Runs the get chain. An absent value bypasses the chain entirely.
pub fn intercept_get<V>(chain: &[RegistryEntry<V>], value: Option<V>) -> Result<Option<V>> {
    let Some(mut value) = value else {
        return Ok(None);
    };

    for entry in chain {
        value = entry
            .handle
            .interceptor()
            .intercept_get(value)
            .map_err(|e| chain_failure(&entry.id, e))?;
    }

    for entry in chain {
        report_after_failure("after_get", &entry.id, entry.handle.interceptor().after_get(&value));
    }

    Ok(Some(value))
}

/// Runs the put chain and returns the value to store.
pub fn intercept_put<V>(chain: &[RegistryEntry<V>], old: Option<&V>, new: V) -> Result<V> {
    let mut value = new;
    for entry in chain {
        value = entry
            .handle
            .interceptor()
            .intercept_put(old, value)
            .map_err(|e| chain_failure(&entry.id, e))?;
    }
    Ok(value)
}

/// Notifies every interceptor that `stored` was committed.
pub fn after_put<V>(chain: &[RegistryEntry<V>], stored: &V) {
    for entry in chain {
        report_after_failure("after_put", &entry.id, entry.handle.interceptor().after_put(stored));
    }
}

/// Runs the remove chain.
///
/// Returns the value to report as removed, or `MapError::Veto` naming the
/// first interceptor that rejected the removal. The caller commits the
/// removal only on `Ok`.
pub fn intercept_remove<V>(chain: &[RegistryEntry<V>], removed: V) -> Result<V> {
    let mut value = removed;

    for entry in chain {
        let outcome = entry
            .handle
            .interceptor()
            .intercept_remove(value)
            .map_err(|e| chain_failure(&entry.id, e))?;

        match outcome {
            RemoveOutcome::Proceed(next) => value = next,
            RemoveOutcome::Veto { reason } => {
                tracing::debug!("Remove vetoed by interceptor {}: {}", entry.id, reason);
                return Err(MapError::Veto {
                    interceptor: entry.id.clone(),
                    reason,
                });
            }
        }
    }

    Ok(value)
}

/// Notifies every interceptor that `removed` left the map.
pub fn after_remove<V>(chain: &[RegistryEntry<V>], removed: &V) {
    for entry in chain {
        report_after_failure(
            "after_remove",
            &entry.id,
            entry.handle.interceptor().after_remove(removed),
        );
    }
}

fn chain_failure(id: &InterceptorId, error: InterceptorError) -> MapError {
    MapError::Interceptor {
        interceptor: id.clone(),
        reason: error.reason,
    }
}

fn report_after_failure(hook: &str, id: &InterceptorId, result: std::result::Result<(), InterceptorError>) {
    if let Err(e) = result {
        tracing::warn!("Interceptor {} failed in {} (ignored): {}", id, hook, e);
    }
}
