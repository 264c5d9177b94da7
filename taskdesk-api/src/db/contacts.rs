//! Contact database operations

use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use taskdesk_common::db::{Contact, ContactDetail, ContactSummary, Membership, ProjectSummary};
use taskdesk_common::time::{now, to_db};
use taskdesk_common::{uuid_utils, Result};
use tracing::info;
use uuid::Uuid;

use super::{enum_col, like_pattern, uuid_col};
use crate::pagination::PageRequest;

pub(crate) const CONTACT_COLUMNS: &str =
    "id, first_name, last_name, email, phone, company, notes, created_at, updated_at";

/// Validated input for a new contact
#[derive(Debug, Clone)]
pub struct NewContact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub notes: Option<String>,
}

/// Partial update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default)]
pub struct ContactChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<Option<String>>,
    pub company: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

/// List filters
#[derive(Debug, Clone, Default)]
pub struct ContactFilter {
    /// Substring of first name, last name, email or company
    pub search: Option<String>,
    /// Exact company (case-insensitive)
    pub company: Option<String>,
}

pub(crate) fn contact_from_row(row: &SqliteRow) -> Result<Contact> {
    Ok(Contact {
        id: uuid_col(row, "id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        company: row.try_get("company")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ContactFilter) {
    qb.push(" WHERE 1 = 1");

    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        qb.push(" AND (first_name LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR last_name LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR email LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR company LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }

    if let Some(company) = &filter.company {
        qb.push(" AND company = ")
            .push_bind(company.clone())
            .push(" COLLATE NOCASE");
    }
}

/// List contacts ordered by last name, first name
///
/// Returns the requested page and the total number of matches.
pub async fn list_contacts(
    pool: &SqlitePool,
    filter: &ContactFilter,
    page: PageRequest,
) -> Result<(Vec<Contact>, i64)> {
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM contacts");
    push_filters(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM contacts", CONTACT_COLUMNS));
    push_filters(&mut select, filter);
    select
        .push(" ORDER BY last_name COLLATE NOCASE, first_name COLLATE NOCASE, id LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());

    let rows = select.build().fetch_all(pool).await?;
    let contacts = rows.iter().map(contact_from_row).collect::<Result<Vec<_>>>()?;

    Ok((contacts, total))
}

pub async fn get_contact(pool: &SqlitePool, id: Uuid) -> Result<Option<Contact>> {
    let row = sqlx::query(&format!("SELECT {} FROM contacts WHERE id = ?", CONTACT_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(contact_from_row).transpose()
}

/// Contact with assigned tasks and project memberships
pub async fn get_contact_detail(pool: &SqlitePool, id: Uuid) -> Result<Option<ContactDetail>> {
    let Some(contact) = get_contact(pool, id).await? else {
        return Ok(None);
    };

    let assigned_tasks = super::tasks::tasks_for_assignee(pool, id).await?;

    let rows = sqlx::query(
        r#"
        SELECT p.id, p.name, p.status, m.role, m.joined_at
        FROM project_members m
        JOIN projects p ON p.id = m.project_id
        WHERE m.contact_id = ?
        ORDER BY p.name COLLATE NOCASE
        "#,
    )
    .bind(id.to_string())
    .fetch_all(pool)
    .await?;

    let projects = rows
        .iter()
        .map(|row| {
            Ok(Membership {
                project: ProjectSummary {
                    id: uuid_col(row, "id")?,
                    name: row.try_get("name")?,
                    status: enum_col(row, "status")?,
                },
                role: row.try_get("role")?,
                joined_at: row.try_get("joined_at")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(ContactDetail {
        contact,
        assigned_tasks,
        projects,
    }))
}

pub(crate) async fn contact_summary(pool: &SqlitePool, id: Uuid) -> Result<Option<ContactSummary>> {
    let row = sqlx::query("SELECT id, first_name, last_name, email FROM contacts WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.map(|row| {
        Ok(ContactSummary {
            id: uuid_col(&row, "id")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
        })
    })
    .transpose()
}

pub async fn create_contact(pool: &SqlitePool, input: NewContact) -> Result<Contact> {
    let id = uuid_utils::generate();
    let timestamp = to_db(&now());

    let row = sqlx::query(&format!(
        r#"
        INSERT INTO contacts (id, first_name, last_name, email, phone, company, notes, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        CONTACT_COLUMNS
    ))
    .bind(id.to_string())
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(&input.company)
    .bind(&input.notes)
    .bind(&timestamp)
    .bind(&timestamp)
    .fetch_one(pool)
    .await?;

    info!("Created contact {} <{}>", id, input.email);
    contact_from_row(&row)
}

/// Apply a partial update; `Ok(None)` when the contact does not exist
pub async fn update_contact(
    pool: &SqlitePool,
    id: Uuid,
    changes: ContactChanges,
) -> Result<Option<Contact>> {
    let mut qb = QueryBuilder::<Sqlite>::new("UPDATE contacts SET updated_at = ");
    qb.push_bind(to_db(&now()));

    if let Some(first_name) = changes.first_name {
        qb.push(", first_name = ").push_bind(first_name);
    }
    if let Some(last_name) = changes.last_name {
        qb.push(", last_name = ").push_bind(last_name);
    }
    if let Some(email) = changes.email {
        qb.push(", email = ").push_bind(email);
    }
    if let Some(phone) = changes.phone {
        qb.push(", phone = ").push_bind(phone);
    }
    if let Some(company) = changes.company {
        qb.push(", company = ").push_bind(company);
    }
    if let Some(notes) = changes.notes {
        qb.push(", notes = ").push_bind(notes);
    }

    qb.push(" WHERE id = ")
        .push_bind(id.to_string())
        .push(format!(" RETURNING {}", CONTACT_COLUMNS));

    let row = qb.build().fetch_optional(pool).await?;
    if row.is_some() {
        info!("Updated contact {}", id);
    }
    row.as_ref().map(contact_from_row).transpose()
}

/// Delete a contact, returning the removed record
///
/// Memberships go with it; assigned tasks and owned projects are detached.
pub async fn delete_contact(pool: &SqlitePool, id: Uuid) -> Result<Option<Contact>> {
    let row = sqlx::query(&format!(
        "DELETE FROM contacts WHERE id = ? RETURNING {}",
        CONTACT_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    if row.is_some() {
        info!("Deleted contact {}", id);
    }
    row.as_ref().map(contact_from_row).transpose()
}
