//! HTTP handlers of the node binary.
//!
//! Every route works on `String -> String` maps so that values and
//! interceptors can be expressed in JSON without user code.

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
};

use super::node::ClusterNode;
use super::protocol::{
    AddInterceptorResponse, ENDPOINT_ADD_INTERCEPTOR, ENDPOINT_GET, ENDPOINT_PUT,
    ENDPOINT_REGISTRY, ENDPOINT_REMOVE, ENDPOINT_REMOVE_INTERCEPTOR, GetResponse, PutRequest,
    PutResponse, RegistryTransfer, RemoveInterceptorResponse, RemoveResponse,
};
use crate::error::{MapError, Result};
use crate::interceptor::builtin::{
    BuiltinInterceptor, GuardInterceptor, SuffixInterceptor, UppercaseInterceptor,
    register_builtin_kinds,
};
use crate::interceptor::types::InterceptorId;
use crate::map::proxy::DistributedMap;

/// All routes of the node binary, bound to `node`.
pub fn router(node: ClusterNode) -> Router {
    Router::new()
        .route(ENDPOINT_PUT, post(handle_put))
        .route(ENDPOINT_GET, get(handle_get))
        .route(ENDPOINT_REMOVE, post(handle_remove))
        .route(ENDPOINT_ADD_INTERCEPTOR, post(handle_add_interceptor))
        .route(ENDPOINT_REMOVE_INTERCEPTOR, post(handle_remove_interceptor))
        .route(ENDPOINT_REGISTRY, get(handle_registry_export))
        .layer(Extension(node))
}

/// Obtains a string map with every built-in interceptor kind decodable.
pub async fn string_map(node: &ClusterNode, name: &str) -> Result<DistributedMap<String, String>> {
    let map = node.get_map::<String, String>(name).await?;
    register_builtin_kinds(&map.interceptor_factory());
    Ok(map)
}

fn status_of(error: &MapError) -> StatusCode {
    match error {
        MapError::Veto { .. } => StatusCode::CONFLICT,
        MapError::Destroyed(_) => StatusCode::NOT_FOUND,
        MapError::TypeMismatch { .. } => StatusCode::BAD_REQUEST,
        MapError::NoOwner(_) | MapError::UnknownMember(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn handle_put(
    Extension(node): Extension<ClusterNode>,
    Path(name): Path<String>,
    Json(req): Json<PutRequest>,
) -> (StatusCode, Json<PutResponse>) {
    let result = match string_map(&node, &name).await {
        Ok(map) => map.put(req.key, req.value).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(previous) => (
            StatusCode::OK,
            Json(PutResponse {
                success: true,
                previous,
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!("Put on map '{}' failed: {}", name, e);
            (
                status_of(&e),
                Json(PutResponse {
                    error: Some(e.to_string()),
                    ..Default::default()
                }),
            )
        }
    }
}

pub async fn handle_get(
    Extension(node): Extension<ClusterNode>,
    Path((name, key)): Path<(String, String)>,
) -> (StatusCode, Json<GetResponse>) {
    let result = match string_map(&node, &name).await {
        Ok(map) => map.get(&key).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(Some(value)) => (
            StatusCode::OK,
            Json(GetResponse {
                value: Some(value),
                error: None,
            }),
        ),
        Ok(None) => (StatusCode::NOT_FOUND, Json(GetResponse::default())),
        Err(e) => {
            tracing::error!("Get on map '{}' failed: {}", name, e);
            (
                status_of(&e),
                Json(GetResponse {
                    value: None,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

pub async fn handle_remove(
    Extension(node): Extension<ClusterNode>,
    Path((name, key)): Path<(String, String)>,
) -> (StatusCode, Json<RemoveResponse>) {
    let result = match string_map(&node, &name).await {
        Ok(map) => map.remove(&key).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(removed) => (
            StatusCode::OK,
            Json(RemoveResponse {
                removed,
                ..Default::default()
            }),
        ),
        Err(e) => {
            if e.is_veto() {
                tracing::info!("Remove of '{}' on map '{}' vetoed: {}", key, name, e);
            } else {
                tracing::error!("Remove on map '{}' failed: {}", name, e);
            }
            (
                status_of(&e),
                Json(RemoveResponse {
                    removed: None,
                    vetoed: e.is_veto(),
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

async fn add_builtin(
    map: &DistributedMap<String, String>,
    interceptor: BuiltinInterceptor,
) -> Result<InterceptorId> {
    match interceptor {
        BuiltinInterceptor::Suffix { suffix } => {
            map.add_interceptor(SuffixInterceptor { suffix }).await
        }
        BuiltinInterceptor::Uppercase => map.add_interceptor(UppercaseInterceptor).await,
        BuiltinInterceptor::Guard { protected } => {
            map.add_interceptor(GuardInterceptor::protecting(protected)).await
        }
    }
}

pub async fn handle_add_interceptor(
    Extension(node): Extension<ClusterNode>,
    Path(name): Path<String>,
    Json(interceptor): Json<BuiltinInterceptor>,
) -> (StatusCode, Json<AddInterceptorResponse>) {
    let result = match string_map(&node, &name).await {
        Ok(map) => add_builtin(&map, interceptor).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(id) => (
            StatusCode::OK,
            Json(AddInterceptorResponse {
                id: Some(id),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!("Adding interceptor to map '{}' failed: {}", name, e);
            (
                status_of(&e),
                Json(AddInterceptorResponse {
                    id: None,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

pub async fn handle_remove_interceptor(
    Extension(node): Extension<ClusterNode>,
    Path((name, id)): Path<(String, String)>,
) -> (StatusCode, Json<RemoveInterceptorResponse>) {
    let result = match string_map(&node, &name).await {
        Ok(map) => map.remove_interceptor(&InterceptorId(id)).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(removed) => (StatusCode::OK, Json(RemoveInterceptorResponse { removed })),
        Err(e) => {
            tracing::error!("Removing interceptor from map '{}' failed: {}", name, e);
            (status_of(&e), Json(RemoveInterceptorResponse { removed: false }))
        }
    }
}

/// Serves this member's registry of `name` to a joining node.
pub async fn handle_registry_export(
    Extension(node): Extension<ClusterNode>,
    Path(name): Path<String>,
) -> (StatusCode, Json<Option<RegistryTransfer>>) {
    match node.export_registry(&name).await {
        Ok(transfer) => (StatusCode::OK, Json(Some(transfer))),
        Err(e) => {
            tracing::warn!("Registry export of map '{}' failed: {}", name, e);
            (status_of(&e), Json(None))
        }
    }
}
