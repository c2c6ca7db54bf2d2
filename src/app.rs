use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::auth::JwtKeys;
use crate::config::SecurityConfig;
use crate::handlers::{protected, public};
use crate::middleware::principal_middleware;
use crate::schema::EntityRegistry;
use crate::search::SearchEngine;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub engine: SearchEngine,
    pub registry: Arc<EntityRegistry>,
    pub jwt: JwtKeys,
}

impl AppState {
    pub fn new(engine: SearchEngine, registry: EntityRegistry, jwt: JwtKeys) -> Self {
        Self {
            engine,
            registry: Arc::new(registry),
            jwt,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Scoped search
        .merge(search_routes(state.jwt.clone()))
        .with_state(state)
}

fn search_routes(jwt: JwtKeys) -> Router<AppState> {
    use protected::{data, find};

    Router::new()
        .route("/api/data/:entity", get(data::schema_get))
        .route("/api/data/:entity/:id", get(data::record_get))
        .route("/api/find/:entity", post(find::find_post))
        .layer(from_fn_with_state(jwt, principal_middleware))
}

/// CORS from configuration; disabled CORS yields a layer that allows nothing
pub fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
