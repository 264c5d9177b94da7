//! taskdesk-api library - contacts, tasks and projects over HTTP
//!
//! Routes live under `/api/v1/{contact,task,project}`, plus `/health`. Every
//! response body is an [`taskdesk_common::api::ApiResponse`] envelope.

use std::path::Path;
use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    middleware, Router,
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use taskdesk_common::config::ServerConfig;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::warn;

pub mod api;
pub mod db;
pub mod error;
pub mod pagination;
pub mod validation;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Resolved server configuration
    pub config: Arc<ServerConfig>,
    /// Service startup timestamp (for uptime)
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, config: ServerConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let api = api::v1_routes().fallback(api::route_not_found);

    let router = Router::new()
        .nest("/api", api)
        .merge(api::health_routes());

    let router = match &state.config.static_dir {
        Some(dir) => router.fallback_service(spa_service(dir)),
        None => router.fallback(api::route_not_found),
    };

    router
        .layer(CatchPanicLayer::custom(error::handle_panic))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            error::expose_error_detail,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(state.config.cors_origin.as_deref()))
        .with_state(state)
}

/// Built client bundle; unknown paths get `index.html` for client-side routing
fn spa_service(dir: &Path) -> ServeDir<ServeFile> {
    ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")))
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let Some(origin) = origin else {
        return CorsLayer::permissive();
    };

    match origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
            ])
            .allow_headers([header::CONTENT_TYPE]),
        Err(_) => {
            warn!("Ignoring invalid CORS origin '{}'; cross-origin requests disabled", origin);
            CorsLayer::new()
        }
    }
}
