//! Cluster Protocol
//!
//! Messages exchanged when the member set changes, plus the HTTP endpoints and
//! DTOs of the node binary. Registry transfers travel as bincode frames between
//! in-process members and as JSON over HTTP.

use crate::error::TransportError;
use crate::interceptor::types::InterceptorId;
use serde::{Deserialize, Serialize};

// --- API Endpoints ---

pub const ENDPOINT_PUT: &str = "/map/:name/put";
pub const ENDPOINT_GET: &str = "/map/:name/get/:key";
pub const ENDPOINT_REMOVE: &str = "/map/:name/remove/:key";
pub const ENDPOINT_ADD_INTERCEPTOR: &str = "/map/:name/interceptors";
pub const ENDPOINT_REMOVE_INTERCEPTOR: &str = "/map/:name/interceptors/remove/:id";
/// Registry export pulled by members joining through a seed.
pub const ENDPOINT_REGISTRY: &str = "/internal/interceptors/:name";

// --- State transfer ---

/// One interceptor as it crosses a member boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferredInterceptor {
    pub id: InterceptorId,
    pub kind: String,
    pub state_json: String,
}

/// A map's interceptor registry in registration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryTransfer {
    pub map_name: String,
    pub entries: Vec<TransferredInterceptor>,
}

impl RegistryTransfer {
    pub fn to_frame(&self) -> Result<Vec<u8>, TransportError> {
        bincode::serialize(self).map_err(|e| TransportError::Frame(e.to_string()))
    }

    pub fn from_frame(bytes: &[u8]) -> Result<Self, TransportError> {
        bincode::deserialize(bytes).map_err(|e| TransportError::Frame(e.to_string()))
    }
}

/// A single migrated record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyValueJson {
    pub key_json: String,
    pub value_json: String,
}

// --- Data Transfer Objects ---

#[derive(Debug, Serialize, Deserialize)]
pub struct PutRequest {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PutResponse {
    pub success: bool,
    /// Value stored before this put, as it was stored.
    pub previous: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GetResponse {
    pub value: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RemoveResponse {
    pub removed: Option<String>,
    pub vetoed: bool,
    pub error: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AddInterceptorResponse {
    pub id: Option<InterceptorId>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RemoveInterceptorResponse {
    pub removed: bool,
}
