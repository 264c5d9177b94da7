//! API error type and the global error handling middleware
//!
//! Every failure leaves the service as an [`ApiResponse`] envelope. SQLite
//! constraint violations are classified here: UNIQUE → 409, FOREIGN KEY →
//! 400, NOT NULL / CHECK → 400, missing row → 404. Anything unclassified is
//! a 500 whose error chain is only disclosed in the development environment.

use std::any::Any;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use sqlx::error::ErrorKind;
use taskdesk_common::api::{ApiResponse, FieldError};
use thiserror::Error;
use tracing::{error, warn};

use crate::AppState;

/// Message used for every 500 response
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request failed schema validation (400)
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    /// Malformed request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Referenced record does not exist (400)
    #[error("Referenced record does not exist")]
    InvalidReference,

    /// Resource not found (404)
    #[error("{0}")]
    NotFound(String),

    /// No route for method + path (404)
    #[error("Route {method} {path} not found")]
    RouteNotFound { method: String, path: String },

    /// Uniqueness conflict (409)
    #[error("{message}")]
    Conflict {
        message: String,
        errors: Vec<FieldError>,
    },

    /// Unclassified database failure (500)
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Other taskdesk-common failure (500)
    #[error(transparent)]
    Common(taskdesk_common::Error),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn not_found(entity: &str) -> Self {
        ApiError::NotFound(format!("{} not found", entity))
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) | ApiError::InvalidReference => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) | ApiError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Common(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Display text plus every `source()` below it
    fn chain(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            out.push_str("\n  caused by: ");
            out.push_str(&cause.to_string());
            source = cause.source();
        }
        out
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = err {
            return ApiError::not_found("Record");
        }

        let kind = match err.as_database_error() {
            Some(db_err) => db_err.kind(),
            None => return ApiError::Database(err),
        };

        match kind {
            ErrorKind::UniqueViolation => {
                let message = err
                    .as_database_error()
                    .map(|e| e.message().to_string())
                    .unwrap_or_default();
                unique_conflict(&message)
            }
            ErrorKind::ForeignKeyViolation => ApiError::InvalidReference,
            ErrorKind::NotNullViolation | ErrorKind::CheckViolation => ApiError::BadRequest(
                err.as_database_error()
                    .map(|e| e.message().to_string())
                    .unwrap_or_else(|| "Constraint violation".to_string()),
            ),
            _ => ApiError::Database(err),
        }
    }
}

impl From<taskdesk_common::Error> for ApiError {
    fn from(err: taskdesk_common::Error) -> Self {
        match err {
            taskdesk_common::Error::Database(e) => ApiError::from(e),
            taskdesk_common::Error::NotFound(what) => ApiError::not_found(&what),
            taskdesk_common::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Common(other),
        }
    }
}

/// Build a 409 from SQLite's "UNIQUE constraint failed: table.col[, table.col]" text
fn unique_conflict(db_message: &str) -> ApiError {
    let targets: Vec<(&str, &str)> = db_message
        .split_once(':')
        .map(|(_, cols)| cols)
        .unwrap_or("")
        .split(',')
        .filter_map(|target| target.trim().split_once('.'))
        .collect();

    let table = targets.first().map(|(table, _)| *table).unwrap_or("");
    let message = match table {
        "contacts" => "A contact with this email already exists",
        "project_members" => "Contact is already a member of this project",
        _ => "Record already exists",
    };

    let errors = targets
        .iter()
        .map(|(_, column)| FieldError::new(camel_case(column), "must be unique"))
        .collect();

    ApiError::Conflict {
        message: message.to_string(),
        errors,
    }
}

fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Error chain carried from a 500 response to [`expose_error_detail`]
#[derive(Debug, Clone)]
pub struct ErrorTrace(pub String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let trace = self.chain();
            error!("Request failed: {}", trace);
            let body = ApiResponse::failure(INTERNAL_ERROR_MESSAGE);
            let mut response = (status, Json(body)).into_response();
            response.extensions_mut().insert(ErrorTrace(trace));
            return response;
        }

        let body = match self {
            ApiError::Validation(errors) => {
                ApiResponse::failure("Validation failed").with_errors(errors)
            }
            ApiError::Conflict { message, errors } => {
                warn!("Conflict: {}", message);
                ApiResponse::failure(message).with_errors(errors)
            }
            ApiError::InvalidReference => {
                warn!("Foreign key violation");
                ApiResponse::failure("Referenced record does not exist")
            }
            other => ApiResponse::failure(other.to_string()),
        };

        (status, Json(body)).into_response()
    }
}

/// Global error handler
///
/// In development, 500 responses are re-rendered with the error chain in
/// `stack`; in production the trace is dropped.
pub async fn expose_error_detail(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    let Some(ErrorTrace(trace)) = response.extensions_mut().remove::<ErrorTrace>() else {
        return response;
    };

    if !state.config.environment.is_development() {
        return response;
    }

    let body = ApiResponse::failure(INTERNAL_ERROR_MESSAGE).with_stack(trace);
    (response.status(), Json(body)).into_response()
}

/// Render a handler panic as the 500 envelope
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    ApiError::Internal(format!("handler panicked: {}", detail)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_conflict_contacts_email() {
        match unique_conflict("UNIQUE constraint failed: contacts.email") {
            ApiError::Conflict { message, errors } => {
                assert!(message.contains("email already exists"));
                assert_eq!(errors, vec![FieldError::new("email", "must be unique")]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unique_conflict_composite_key() {
        let err = unique_conflict(
            "UNIQUE constraint failed: project_members.project_id, project_members.contact_id",
        );
        match err {
            ApiError::Conflict { message, errors } => {
                assert_eq!(message, "Contact is already a member of this project");
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["projectId", "contactId"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unique_conflict_unparseable_message() {
        match unique_conflict("something else") {
            ApiError::Conflict { message, errors } => {
                assert_eq!(message, "Record already exists");
                assert!(errors.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::InvalidReference.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::not_found("Task").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(sqlx::Error::RowNotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_server_errors_hide_detail_and_carry_trace() {
        let response = ApiError::Internal("secret detail".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let trace = response.extensions().get::<ErrorTrace>().unwrap();
        assert!(trace.0.contains("secret detail"));
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("first_name"), "firstName");
        assert_eq!(camel_case("email"), "email");
    }
}
