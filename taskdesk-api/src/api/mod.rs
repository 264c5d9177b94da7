//! HTTP API handlers for taskdesk-api

pub mod contact;
pub mod health;
pub mod project;
pub mod task;

use axum::{extract::OriginalUri, http::Method, Router};

use crate::error::ApiError;
use crate::AppState;

pub use contact::contact_routes;
pub use health::health_routes;
pub use project::project_routes;
pub use task::task_routes;

/// Rejection text for an update body with no recognised fields
pub(crate) const EMPTY_UPDATE_MESSAGE: &str = "At least one field must be provided";

/// Versioned resource routes, mounted under `/api`
pub fn v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/v1/contact", contact_routes())
        .nest("/v1/task", task_routes())
        .nest("/v1/project", project_routes())
}

/// Fallback for unmatched routes
pub async fn route_not_found(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::RouteNotFound {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}
