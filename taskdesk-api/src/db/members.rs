//! Project membership operations

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use taskdesk_common::db::{ContactSummary, MemberEntry};
use taskdesk_common::time::{now, to_db};
use taskdesk_common::{uuid_utils, Result};
use tracing::info;
use uuid::Uuid;

use super::uuid_col;

const MEMBER_SELECT: &str = r#"
    SELECT m.id, m.role, m.joined_at,
           c.id AS contact_id, c.first_name, c.last_name, c.email
    FROM project_members m
    JOIN contacts c ON c.id = m.contact_id
"#;

fn member_from_row(row: &SqliteRow) -> Result<MemberEntry> {
    Ok(MemberEntry {
        id: uuid_col(row, "id")?,
        contact: ContactSummary {
            id: uuid_col(row, "contact_id")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
        },
        role: row.try_get("role")?,
        joined_at: row.try_get("joined_at")?,
    })
}

/// Members of a project, earliest joiner first
pub async fn list_members(pool: &SqlitePool, project_id: Uuid) -> Result<Vec<MemberEntry>> {
    let rows = sqlx::query(&format!(
        "{} WHERE m.project_id = ? ORDER BY m.joined_at, c.last_name COLLATE NOCASE",
        MEMBER_SELECT
    ))
    .bind(project_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(member_from_row).collect()
}

async fn get_member(
    pool: &SqlitePool,
    project_id: Uuid,
    contact_id: Uuid,
) -> Result<Option<MemberEntry>> {
    let row = sqlx::query(&format!(
        "{} WHERE m.project_id = ? AND m.contact_id = ?",
        MEMBER_SELECT
    ))
    .bind(project_id.to_string())
    .bind(contact_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(member_from_row).transpose()
}

/// Add a contact to a project
///
/// A duplicate membership surfaces as a UNIQUE violation, an unknown
/// project or contact as a FOREIGN KEY violation.
pub async fn add_member(
    pool: &SqlitePool,
    project_id: Uuid,
    contact_id: Uuid,
    role: &str,
) -> Result<MemberEntry> {
    let id = uuid_utils::generate();

    sqlx::query(
        r#"
        INSERT INTO project_members (id, project_id, contact_id, role, joined_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(project_id.to_string())
    .bind(contact_id.to_string())
    .bind(role)
    .bind(to_db(&now()))
    .execute(pool)
    .await?;

    info!("Added contact {} to project {} as {}", contact_id, project_id, role);

    get_member(pool, project_id, contact_id)
        .await?
        .ok_or_else(|| taskdesk_common::Error::NotFound(format!("Membership {}", id)))
}

pub async fn update_member_role(
    pool: &SqlitePool,
    project_id: Uuid,
    contact_id: Uuid,
    role: &str,
) -> Result<Option<MemberEntry>> {
    let result = sqlx::query(
        "UPDATE project_members SET role = ? WHERE project_id = ? AND contact_id = ?",
    )
    .bind(role)
    .bind(project_id.to_string())
    .bind(contact_id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    info!("Contact {} is now {} on project {}", contact_id, role, project_id);
    get_member(pool, project_id, contact_id).await
}

/// Remove a contact from a project, returning the removed membership
pub async fn remove_member(
    pool: &SqlitePool,
    project_id: Uuid,
    contact_id: Uuid,
) -> Result<Option<MemberEntry>> {
    let mut tx = pool.begin().await?;

    let Some(removed) = sqlx::query(
        r#"
        DELETE FROM project_members WHERE project_id = ? AND contact_id = ?
        RETURNING id, role, joined_at
        "#,
    )
    .bind(project_id.to_string())
    .bind(contact_id.to_string())
    .fetch_optional(&mut *tx)
    .await?
    else {
        return Ok(None);
    };

    let contact = sqlx::query(
        "SELECT id AS contact_id, first_name, last_name, email FROM contacts WHERE id = ?",
    )
    .bind(contact_id.to_string())
    .fetch_one(&mut *tx)
    .await?;

    let member = MemberEntry {
        id: uuid_col(&removed, "id")?,
        contact: ContactSummary {
            id: uuid_col(&contact, "contact_id")?,
            first_name: contact.try_get("first_name")?,
            last_name: contact.try_get("last_name")?,
            email: contact.try_get("email")?,
        },
        role: removed.try_get("role")?,
        joined_at: removed.try_get("joined_at")?,
    };
    tx.commit().await?;

    info!("Removed contact {} from project {}", contact_id, project_id);
    Ok(Some(member))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::contacts::{create_contact, delete_contact, NewContact};
    use crate::db::projects::{create_project, NewProject};
    use crate::db::test_support::test_pool;
    use taskdesk_common::db::ProjectStatus;

    async fn fixture(pool: &SqlitePool) -> (Uuid, Uuid) {
        let project = create_project(
            pool,
            NewProject {
                name: "Apollo".to_string(),
                description: None,
                status: ProjectStatus::Active,
                start_date: None,
                end_date: None,
                owner_id: None,
            },
        )
        .await
        .unwrap();
        let contact = create_contact(
            pool,
            NewContact {
                first_name: "Grace".to_string(),
                last_name: "Hopper".to_string(),
                email: "grace@example.com".to_string(),
                phone: None,
                company: None,
                notes: None,
            },
        )
        .await
        .unwrap();
        (project.id, contact.id)
    }

    #[tokio::test]
    async fn test_add_and_list_members() {
        let (_dir, pool) = test_pool().await;
        let (project_id, contact_id) = fixture(&pool).await;

        let member = add_member(&pool, project_id, contact_id, "member").await.unwrap();
        assert_eq!(member.contact.id, contact_id);
        assert_eq!(member.contact.email, "grace@example.com");

        let members = list_members(&pool, project_id).await.unwrap();
        assert_eq!(members, vec![member]);
    }

    #[tokio::test]
    async fn test_duplicate_membership_is_unique_violation() {
        let (_dir, pool) = test_pool().await;
        let (project_id, contact_id) = fixture(&pool).await;
        add_member(&pool, project_id, contact_id, "member").await.unwrap();

        let err = add_member(&pool, project_id, contact_id, "lead").await.unwrap_err();
        match err {
            taskdesk_common::Error::Database(e) => {
                assert!(e.as_database_error().unwrap().is_unique_violation())
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let (_dir, pool) = test_pool().await;
        let (project_id, contact_id) = fixture(&pool).await;
        add_member(&pool, project_id, contact_id, "member").await.unwrap();

        let updated = update_member_role(&pool, project_id, contact_id, "lead")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.role, "lead");

        let removed = remove_member(&pool, project_id, contact_id).await.unwrap().unwrap();
        assert_eq!(removed, updated);
        assert!(list_members(&pool, project_id).await.unwrap().is_empty());
        assert!(remove_member(&pool, project_id, contact_id).await.unwrap().is_none());
        assert!(update_member_role(&pool, project_id, contact_id, "x")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_deleting_contact_removes_membership() {
        let (_dir, pool) = test_pool().await;
        let (project_id, contact_id) = fixture(&pool).await;
        add_member(&pool, project_id, contact_id, "member").await.unwrap();

        delete_contact(&pool, contact_id).await.unwrap();
        assert!(list_members(&pool, project_id).await.unwrap().is_empty());
    }
}
