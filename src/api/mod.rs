mod handlers;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::models::Document;
use crate::registry::RegistryHandle;

/// Owner of record for models created over HTTP.
///
/// The registry itself never owns a model; documents created through the
/// adapter live here until their path is deleted, at which point the last
/// strong reference drops and any remaining proxies go stale.
#[derive(Clone, Default)]
pub struct ModelStore {
    inner: Arc<Mutex<HashMap<String, Arc<Document>>>>,
}

impl ModelStore {
    pub fn insert(&self, path: &str, model: Arc<Document>) {
        let mut models = self.inner.lock().expect("model store lock poisoned");
        models.insert(path.to_string(), model);
    }

    pub fn remove(&self, path: &str) -> Option<Arc<Document>> {
        let mut models = self.inner.lock().expect("model store lock poisoned");
        models.remove(path)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub registry: RegistryHandle,
    pub models: ModelStore,
}

impl AppState {
    pub fn new(registry: RegistryHandle) -> Self {
        Self {
            registry,
            models: ModelStore::default(),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        // Keys
        .route("/keys", get(handlers::all_keys))
        .route("/keys/{*path}", get(handlers::child_keys))
        // Nested key hierarchy
        .route("/tree", get(handlers::full_tree))
        .route("/tree/{*path}", get(handlers::sub_tree))
        // Field values
        .route(
            "/values/{*path}",
            get(handlers::get_values).put(handlers::put_values),
        )
        // Server-owned models
        .route(
            "/models/{*path}",
            post(handlers::create_model).delete(handlers::delete_model),
        )
        // Event relay
        .route("/events", get(handlers::events))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
