use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
    Json,
};
use serde_json::{Map, Value};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};

use crate::error::RegistryError;
use crate::models::{Document, Fields};
use crate::registry::KeyTree;

use super::AppState;

// ============================================================
// Error Handling
// ============================================================

/// Map a registry failure onto its status code. Every core error is caused
/// by the request, so the message is safe to return as-is.
fn registry_error(e: RegistryError) -> (StatusCode, String) {
    let status = match &e {
        RegistryError::InvalidPath { .. } => StatusCode::BAD_REQUEST,
        RegistryError::PathNotFound(_) => StatusCode::NOT_FOUND,
        RegistryError::AlreadyBound(_) => StatusCode::CONFLICT,
    };
    tracing::warn!("registry error: {}", e);
    (status, e.to_string())
}

/// Wildcard captures arrive without the leading separator; node paths
/// always carry it.
fn node_path(state: &AppState, raw: &str) -> String {
    format!("{}{}", state.registry.separator(), raw)
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Keys
// ============================================================

pub async fn all_keys(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.registry.nodes())
}

pub async fn child_keys(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<Vec<String>>, (StatusCode, String)> {
    let path = node_path(&state, &path);
    state
        .registry
        .children(Some(&path))
        .map(Json)
        .map_err(registry_error)
}

// ============================================================
// Tree
// ============================================================

pub async fn full_tree(
    State(state): State<AppState>,
) -> Result<Json<KeyTree>, (StatusCode, String)> {
    state.registry.tree(None).map(Json).map_err(registry_error)
}

pub async fn sub_tree(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<KeyTree>, (StatusCode, String)> {
    let path = node_path(&state, &path);
    state
        .registry
        .tree(Some(&path))
        .map(Json)
        .map_err(registry_error)
}

// ============================================================
// Values
// ============================================================

pub async fn get_values(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<Map<String, Value>>, (StatusCode, String)> {
    let path = node_path(&state, &path);
    state
        .registry
        .values(&path)
        .map(Json)
        .map_err(registry_error)
}

pub async fn put_values(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Json(updates): Json<Map<String, Value>>,
) -> Result<Json<Map<String, Value>>, (StatusCode, String)> {
    let path = node_path(&state, &path);
    let fields = state.registry.node(&path).map_err(registry_error)?;

    // Reject unknown fields before writing anything through.
    for name in updates.keys() {
        if !fields.contains_key(name) {
            return Err((StatusCode::BAD_REQUEST, format!("unknown field `{name}`")));
        }
    }
    for (name, value) in updates {
        if let Some(field) = fields.get(&name) {
            field.set_value(value);
        }
    }

    state
        .registry
        .values(&path)
        .map(Json)
        .map_err(registry_error)
}

// ============================================================
// Models
// ============================================================

pub async fn create_model(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Map<String, Value>>), (StatusCode, String)> {
    let path = node_path(&state, &path);
    let document = Document::from_value(body).ok_or((
        StatusCode::BAD_REQUEST,
        "model body must be a JSON object".to_string(),
    ))?;
    let document = Arc::new(document);
    let model: Arc<dyn Fields> = document.clone();

    state.registry.bind(&path, &model).map_err(registry_error)?;
    state.models.insert(&path, document);

    let values = state.registry.values(&path).map_err(registry_error)?;
    Ok((StatusCode::CREATED, Json(values)))
}

pub async fn delete_model(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let path = node_path(&state, &path);
    state.registry.unbind(&path).map_err(registry_error)?;
    state.models.remove(&path);
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================
// Events
// ============================================================

/// Republish registry events over a persistent SSE connection. Each event
/// is one JSON object, e.g. `{"event": "model_bound", "path": "/a/b"}`.
pub async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.registry.subscribe();
    let stream = BroadcastStream::new(receiver).filter_map(|event| {
        // A subscriber that lags misses overflowed events rather than
        // stalling the registry.
        event
            .ok()
            .and_then(|e| Event::default().json_data(&e).ok())
            .map(Ok)
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
