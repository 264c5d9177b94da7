//! Service layer: one function per operation, each a single query (or a
//! small fixed set of queries) against the shared SQLite pool.

pub mod contacts;
pub mod members;
pub mod projects;
pub mod tasks;

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;
use taskdesk_common::db::UnknownVariant;
use taskdesk_common::uuid_utils::parse_stored;
use taskdesk_common::{Error, Result};
use uuid::Uuid;

pub(crate) fn uuid_col(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let raw: String = row.try_get(column)?;
    parse_stored(column, &raw)
}

pub(crate) fn opt_uuid_col(row: &SqliteRow, column: &str) -> Result<Option<Uuid>> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|value| parse_stored(column, &value)).transpose()
}

pub(crate) fn enum_col<E>(row: &SqliteRow, column: &str) -> Result<E>
where
    E: FromStr<Err = UnknownVariant>,
{
    let raw: String = row.try_get(column)?;
    raw.parse()
        .map_err(|e: UnknownVariant| Error::CorruptRecord(format!("{}: {}", column, e)))
}

/// `%term%` with LIKE wildcards in `term` escaped (pair with `ESCAPE '\'`)
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}


#[cfg(test)]
mod tests {
    use super::*;
    use taskdesk_common::db::TaskStatus;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ada"), "%ada%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[tokio::test]
    async fn test_unknown_stored_enum_is_corrupt_record() {
        let (_dir, pool) = test_support::test_pool().await;
        let row = sqlx::query("SELECT 'in_progress' AS good, 'archived' AS bad")
            .fetch_one(&pool)
            .await
            .unwrap();

        let good: TaskStatus = enum_col(&row, "good").unwrap();
        assert_eq!(good, TaskStatus::InProgress);

        match enum_col::<TaskStatus>(&row, "bad") {
            Err(Error::CorruptRecord(msg)) => assert!(msg.starts_with("bad: 'archived'")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
