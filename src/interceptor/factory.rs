//! Interceptor Codec & Factory
//!
//! Interceptors cross member boundaries as `(kind, state_json)` pairs. The
//! sending side encodes with the closure captured in `InterceptorHandle`; the
//! receiving side rebuilds a fresh instance through the decoder registered for
//! that kind in the map's `InterceptorFactory`.

use super::types::{InterceptorId, MapInterceptor, Transportable};
use crate::error::TransportError;

use dashmap::DashMap;
use std::sync::Arc;

type EncodeFn = Arc<dyn Fn() -> Result<String, serde_json::Error> + Send + Sync>;

/// Type alias for a thread-safe decoder turning serialized state into a live handle.
pub type InterceptorDecoder<V> =
    Arc<dyn Fn(&str) -> Result<InterceptorHandle<V>, serde_json::Error> + Send + Sync>;

/// A live interceptor paired with the means to ship it to another member.
pub struct InterceptorHandle<V> {
    interceptor: Arc<dyn MapInterceptor<V>>,
    kind: &'static str,
    encode: EncodeFn,
}

impl<V> Clone for InterceptorHandle<V> {
    fn clone(&self) -> Self {
        Self {
            interceptor: self.interceptor.clone(),
            kind: self.kind,
            encode: self.encode.clone(),
        }
    }
}

impl<V: 'static> InterceptorHandle<V> {
    pub fn new<I>(interceptor: I) -> Self
    where
        I: MapInterceptor<V> + Transportable + 'static,
    {
        let concrete = Arc::new(interceptor);
        let source = concrete.clone();
        let encode: EncodeFn = Arc::new(move || serde_json::to_string(source.as_ref()));

        Self {
            interceptor: concrete,
            kind: I::KIND,
            encode,
        }
    }
}

impl<V> InterceptorHandle<V> {
    pub fn interceptor(&self) -> &dyn MapInterceptor<V> {
        self.interceptor.as_ref()
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Serializes the interceptor's current state for transfer.
    pub fn encode(&self, id: &InterceptorId) -> Result<String, TransportError> {
        (self.encode)().map_err(|e| TransportError::Encode {
            id: id.clone(),
            kind: self.kind.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Registry mapping interceptor kinds to decoders, shared by every member's
/// copy of one map.
pub struct InterceptorFactory<V> {
    decoders: DashMap<String, InterceptorDecoder<V>>,
}

impl<V: 'static> InterceptorFactory<V> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            decoders: DashMap::new(),
        })
    }

    /// Registers the decoder for `I::KIND`. Re-registering a kind replaces it.
    pub fn register<I>(&self)
    where
        I: MapInterceptor<V> + Transportable + 'static,
    {
        let decoder: InterceptorDecoder<V> = Arc::new(|state: &str| {
            let interceptor: I = serde_json::from_str(state)?;
            Ok(InterceptorHandle::new(interceptor))
        });

        if self.decoders.insert(I::KIND.to_string(), decoder).is_none() {
            tracing::debug!("Registered interceptor kind: {}", I::KIND);
        }
    }

    /// Rebuilds an interceptor from its transferred state.
    pub fn decode(
        &self,
        id: &InterceptorId,
        kind: &str,
        state_json: &str,
    ) -> Result<InterceptorHandle<V>, TransportError> {
        let decoder = self
            .decoders
            .get(kind)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| TransportError::UnknownKind {
                kind: kind.to_string(),
            })?;

        decoder(state_json).map_err(|e| TransportError::Decode {
            id: id.clone(),
            kind: kind.to_string(),
            reason: e.to_string(),
        })
    }

    /// Produces the copy another member receives: encode here, decode there.
    pub fn transport(
        &self,
        id: &InterceptorId,
        handle: &InterceptorHandle<V>,
    ) -> Result<InterceptorHandle<V>, TransportError> {
        let state_json = handle.encode(id)?;
        self.decode(id, handle.kind(), &state_json)
    }

    pub fn has_kind(&self, kind: &str) -> bool {
        self.decoders.contains_key(kind)
    }

    pub fn kinds(&self) -> Vec<String> {
        self.decoders
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }
}
