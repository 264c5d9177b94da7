//! Health check endpoint

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use taskdesk_common::api::ApiResponse;
use tracing::warn;

use crate::AppState;

/// Health check payload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    /// "ok" or "degraded"
    pub status: String,
    /// Service name ("taskdesk-api")
    pub service: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// "connected" or "unreachable"
    pub database: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    pub environment: String,
}

/// GET /health
///
/// 200 while the database answers `SELECT 1`, 503 otherwise.
pub async fn health_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<HealthStatus>>) {
    let uptime = chrono::Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let database_ok = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => true,
        Err(e) => {
            warn!("Health check: database unreachable: {}", e);
            false
        }
    };

    let (code, status, database, message) = if database_ok {
        (StatusCode::OK, "ok", "connected", "Service is healthy")
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "degraded",
            "unreachable",
            "Database is unreachable",
        )
    };

    let health = HealthStatus {
        status: status.to_string(),
        service: "taskdesk-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
        uptime_seconds,
        environment: state.config.environment.to_string(),
    };

    let mut body = ApiResponse::ok(health, message);
    body.success = database_ok;
    (code, Json(body))
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
