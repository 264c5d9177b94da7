//! API types shared by taskdesk HTTP surfaces
//!
//! This module contains ONLY framework-independent types. The axum
//! integration (status codes, `IntoResponse`) lives in taskdesk-api.

pub mod types;

pub use types::{ApiResponse, FieldError, PageMeta};
