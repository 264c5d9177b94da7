//! UUID utilities
//!
//! Record ids are UUIDv4 values stored as TEXT.

use uuid::Uuid;

use crate::{Error, Result};

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse UUID from string
pub fn parse(s: &str) -> std::result::Result<Uuid, uuid::Error> {
    Uuid::parse_str(s)
}

/// Parse a UUID read back from a TEXT column
pub fn parse_stored(column: &str, value: &str) -> Result<Uuid> {
    parse(value).map_err(|e| Error::CorruptRecord(format!("{column} = {value:?}: {e}")))
}
