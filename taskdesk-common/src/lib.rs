//! # taskdesk common library
//!
//! Shared code for the taskdesk service including:
//! - Database initialization, migrations and domain models
//! - The uniform API response envelope
//! - Configuration loading
//! - Time and UUID helpers

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
