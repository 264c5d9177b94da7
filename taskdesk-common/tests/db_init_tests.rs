//! Integration tests for database initialization
//!
//! Covers automatic creation, reopening, relational constraints and the
//! cascade / set-null deletion rules declared on the tables.

use std::path::PathBuf;
use taskdesk_common::db::init::init_database;
use taskdesk_common::db::migrations::{get_schema_version, CURRENT_SCHEMA_VERSION};
use tempfile::TempDir;

fn temp_db() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let path = dir.path().join("nested").join("taskdesk.db");
    (dir, path)
}

async fn insert_contact(pool: &sqlx::SqlitePool, id: &str, email: &str) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO contacts (id, first_name, last_name, email, created_at, updated_at)
         VALUES (?, 'Ada', 'Lovelace', ?, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
    )
    .bind(id)
    .bind(email)
    .execute(pool)
    .await
    .map(|_| ())
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let (_dir, db_path) = temp_db();
    assert!(!db_path.exists());

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let (_dir, db_path) = temp_db();

    let pool1 = init_database(&db_path).await.unwrap();
    insert_contact(&pool1, "c1", "ada@example.com").await.unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contacts")
        .fetch_one(&pool2)
        .await
        .unwrap();
    assert_eq!(count, 1, "Existing rows must survive reopening");

    assert_eq!(get_schema_version(&pool2).await.unwrap(), CURRENT_SCHEMA_VERSION);
}

#[tokio::test]
async fn test_all_tables_created() {
    let (_dir, db_path) = temp_db();
    let pool = init_database(&db_path).await.unwrap();

    for table in ["contacts", "projects", "tasks", "project_members", "schema_version"] {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?)",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(exists, "table {} missing", table);
    }
}

#[tokio::test]
async fn test_email_unique_ignores_case() {
    let (_dir, db_path) = temp_db();
    let pool = init_database(&db_path).await.unwrap();

    insert_contact(&pool, "c1", "ada@example.com").await.unwrap();
    let dup = insert_contact(&pool, "c2", "ADA@example.com").await;

    let err = dup.expect_err("duplicate email must be rejected");
    let db_err = err.as_database_error().expect("database error");
    assert!(db_err.is_unique_violation());
}

#[tokio::test]
async fn test_foreign_keys_enforced_on_every_connection() {
    let (_dir, db_path) = temp_db();
    let pool = init_database(&db_path).await.unwrap();

    // Several attempts so more than one pooled connection gets exercised
    for i in 0..5 {
        let result = sqlx::query(
            "INSERT INTO tasks (id, title, project_id, created_at, updated_at)
             VALUES (?, 'orphan', 'missing-project', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
        )
        .bind(format!("t{}", i))
        .execute(&pool)
        .await;

        let err = result.expect_err("foreign key must be enforced");
        assert!(err.as_database_error().unwrap().is_foreign_key_violation());
    }
}

#[tokio::test]
async fn test_project_delete_cascades() {
    let (_dir, db_path) = temp_db();
    let pool = init_database(&db_path).await.unwrap();

    insert_contact(&pool, "c1", "ada@example.com").await.unwrap();
    sqlx::query(
        "INSERT INTO projects (id, name, created_at, updated_at)
         VALUES ('p1', 'Engine', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO tasks (id, title, project_id, assignee_id, created_at, updated_at)
         VALUES ('t1', 'Design', 'p1', 'c1', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO project_members (id, project_id, contact_id, joined_at)
         VALUES ('m1', 'p1', 'c1', '2024-01-01T00:00:00Z')",
    )
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query("DELETE FROM projects WHERE id = 'p1'")
        .execute(&pool)
        .await
        .unwrap();

    let tasks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
        .fetch_one(&pool)
        .await
        .unwrap();
    let members: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM project_members")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(tasks, 0);
    assert_eq!(members, 0);
}

#[tokio::test]
async fn test_contact_delete_detaches_tasks() {
    let (_dir, db_path) = temp_db();
    let pool = init_database(&db_path).await.unwrap();

    insert_contact(&pool, "c1", "ada@example.com").await.unwrap();
    sqlx::query(
        "INSERT INTO tasks (id, title, assignee_id, created_at, updated_at)
         VALUES ('t1', 'Design', 'c1', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
    )
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query("DELETE FROM contacts WHERE id = 'c1'")
        .execute(&pool)
        .await
        .unwrap();

    let assignee: Option<String> =
        sqlx::query_scalar("SELECT assignee_id FROM tasks WHERE id = 't1'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(assignee.is_none(), "task should survive with assignee cleared");
}
