//! Project database operations

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use taskdesk_common::db::{Project, ProjectDetail, ProjectListItem, ProjectStatus};
use taskdesk_common::time::{now, to_db};
use taskdesk_common::{uuid_utils, Result};
use tracing::info;
use uuid::Uuid;

use super::{enum_col, like_pattern, opt_uuid_col, uuid_col};
use crate::pagination::PageRequest;

const PROJECT_COLUMNS: &str =
    "id, name, description, status, start_date, end_date, owner_id, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<ProjectStatus>,
    pub start_date: Option<Option<DateTime<Utc>>>,
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub owner_id: Option<Option<Uuid>>,
}

/// Outcome of [`update_project`]
#[derive(Debug)]
pub enum ProjectUpdate {
    Updated(Project),
    NotFound,
    /// The merged row would end before it starts; nothing was written
    DatesOutOfOrder,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    pub owner_id: Option<Uuid>,
    /// Substring of name or description
    pub search: Option<String>,
}

fn project_from_row(row: &SqliteRow) -> Result<Project> {
    Ok(Project {
        id: uuid_col(row, "id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        status: enum_col(row, "status")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        owner_id: opt_uuid_col(row, "owner_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ProjectFilter) {
    qb.push(" WHERE 1 = 1");

    if let Some(status) = filter.status {
        qb.push(" AND p.status = ").push_bind(status.as_str());
    }
    if let Some(owner_id) = filter.owner_id {
        qb.push(" AND p.owner_id = ").push_bind(owner_id.to_string());
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        qb.push(" AND (p.name LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR p.description LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

/// List projects with task and member counts, newest first
pub async fn list_projects(
    pool: &SqlitePool,
    filter: &ProjectFilter,
    page: PageRequest,
) -> Result<(Vec<ProjectListItem>, i64)> {
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM projects p");
    push_filters(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut select = QueryBuilder::<Sqlite>::new(
        r#"
        SELECT p.id, p.name, p.description, p.status, p.start_date, p.end_date, p.owner_id,
               p.created_at, p.updated_at,
               (SELECT COUNT(*) FROM tasks t WHERE t.project_id = p.id) AS task_count,
               (SELECT COUNT(*) FROM project_members m WHERE m.project_id = p.id) AS member_count
        FROM projects p
        "#,
    );
    push_filters(&mut select, filter);
    select
        .push(" ORDER BY p.created_at DESC, p.id LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());

    let rows = select.build().fetch_all(pool).await?;
    let items = rows
        .iter()
        .map(|row| {
            Ok(ProjectListItem {
                project: project_from_row(row)?,
                task_count: row.try_get("task_count")?,
                member_count: row.try_get("member_count")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((items, total))
}

pub async fn get_project(pool: &SqlitePool, id: Uuid) -> Result<Option<Project>> {
    let row = sqlx::query(&format!("SELECT {} FROM projects WHERE id = ?", PROJECT_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(project_from_row).transpose()
}

pub async fn project_exists(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?)")
        .bind(id.to_string())
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// Project with owner, tasks and members
pub async fn get_project_detail(pool: &SqlitePool, id: Uuid) -> Result<Option<ProjectDetail>> {
    let Some(project) = get_project(pool, id).await? else {
        return Ok(None);
    };

    let owner = match project.owner_id {
        Some(owner_id) => super::contacts::contact_summary(pool, owner_id).await?,
        None => None,
    };
    let tasks = super::tasks::tasks_for_project(pool, id).await?;
    let members = super::members::list_members(pool, id).await?;

    Ok(Some(ProjectDetail {
        project,
        owner,
        tasks,
        members,
    }))
}

pub async fn create_project(pool: &SqlitePool, input: NewProject) -> Result<Project> {
    let id = uuid_utils::generate();
    let timestamp = to_db(&now());

    let row = sqlx::query(&format!(
        r#"
        INSERT INTO projects (id, name, description, status, start_date, end_date, owner_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        PROJECT_COLUMNS
    ))
    .bind(id.to_string())
    .bind(&input.name)
    .bind(&input.description)
    .bind(input.status.as_str())
    .bind(input.start_date.as_ref().map(to_db))
    .bind(input.end_date.as_ref().map(to_db))
    .bind(input.owner_id.map(|v| v.to_string()))
    .bind(&timestamp)
    .bind(&timestamp)
    .fetch_one(pool)
    .await?;

    info!("Created project {} '{}'", id, input.name);
    project_from_row(&row)
}

/// Apply a partial update, keeping `end_date >= start_date`
///
/// The UPDATE runs first inside a transaction and is rolled back when the
/// merged row would end before it starts.
pub async fn update_project(
    pool: &SqlitePool,
    id: Uuid,
    changes: ProjectChanges,
) -> Result<ProjectUpdate> {
    let mut qb = QueryBuilder::<Sqlite>::new("UPDATE projects SET updated_at = ");
    qb.push_bind(to_db(&now()));

    if let Some(name) = changes.name {
        qb.push(", name = ").push_bind(name);
    }
    if let Some(description) = changes.description {
        qb.push(", description = ").push_bind(description);
    }
    if let Some(status) = changes.status {
        qb.push(", status = ").push_bind(status.as_str());
    }
    if let Some(start_date) = changes.start_date {
        qb.push(", start_date = ").push_bind(start_date.as_ref().map(to_db));
    }
    if let Some(end_date) = changes.end_date {
        qb.push(", end_date = ").push_bind(end_date.as_ref().map(to_db));
    }
    if let Some(owner_id) = changes.owner_id {
        qb.push(", owner_id = ").push_bind(owner_id.map(|v| v.to_string()));
    }

    qb.push(" WHERE id = ")
        .push_bind(id.to_string())
        .push(format!(" RETURNING {}", PROJECT_COLUMNS));

    let mut tx = pool.begin().await?;
    let Some(row) = qb.build().fetch_optional(&mut *tx).await? else {
        return Ok(ProjectUpdate::NotFound);
    };
    let project = project_from_row(&row)?;

    if let (Some(start), Some(end)) = (project.start_date, project.end_date) {
        if end < start {
            tx.rollback().await?;
            return Ok(ProjectUpdate::DatesOutOfOrder);
        }
    }

    tx.commit().await?;
    info!("Updated project {}", id);
    Ok(ProjectUpdate::Updated(project))
}

/// Delete a project; its tasks and memberships cascade
pub async fn delete_project(pool: &SqlitePool, id: Uuid) -> Result<Option<Project>> {
    let row = sqlx::query(&format!(
        "DELETE FROM projects WHERE id = ? RETURNING {}",
        PROJECT_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    if row.is_some() {
        info!("Deleted project {}", id);
    }
    row.as_ref().map(project_from_row).transpose()
}
