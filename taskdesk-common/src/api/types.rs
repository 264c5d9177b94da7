//! Shared API response types
//!
//! Every HTTP response body produced by taskdesk is an [`ApiResponse`]
//! envelope, success or failure alike.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ========================================
// Envelope
// ========================================

/// Uniform response envelope
///
/// ```
/// use taskdesk_common::api::types::ApiResponse;
///
/// let body = ApiResponse::ok(vec![1, 2, 3], "Numbers retrieved");
/// assert!(body.success);
/// assert_eq!(body.data, Some(vec![1, 2, 3]));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    /// Payload; serialized as `null` on failures
    pub data: Option<T>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Field-level problems (validation and constraint failures only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    /// Paging metadata for list endpoints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageMeta>,
    /// Error chain, only ever set in the development environment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Successful envelope carrying `data`
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
            timestamp: crate::time::now(),
            errors: None,
            pagination: None,
            stack: None,
        }
    }

    /// Attach paging metadata
    pub fn with_pagination(mut self, pagination: PageMeta) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

impl ApiResponse<()> {
    /// Failure envelope (`data: null`)
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: message.into(),
            timestamp: crate::time::now(),
            errors: None,
            pagination: None,
            stack: None,
        }
    }

    /// Attach field errors
    pub fn with_errors(mut self, errors: Vec<FieldError>) -> Self {
        if !errors.is_empty() {
            self.errors = Some(errors);
        }
        self
    }

    /// Attach an error chain
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

/// One failing field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Paging metadata returned alongside list payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

// ========================================
// Tests
// ========================================
