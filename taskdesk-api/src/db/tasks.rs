//! Task database operations

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use taskdesk_common::db::{ProjectSummary, Task, TaskDetail, TaskPriority, TaskStatus};
use taskdesk_common::time::{now, to_db};
use taskdesk_common::{uuid_utils, Result};
use tracing::{debug, info};
use uuid::Uuid;

use super::{enum_col, like_pattern, opt_uuid_col, uuid_col};
use crate::pagination::PageRequest;

const TASK_COLUMNS: &str =
    "id, title, description, status, priority, due_date, project_id, assignee_id, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub project_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub project_id: Option<Option<Uuid>>,
    pub assignee_id: Option<Option<Uuid>>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub project_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    /// Substring of title or description
    pub search: Option<String>,
    /// `Some(true)`: due date passed and not done; `Some(false)`: the rest
    pub overdue: Option<bool>,
}

pub(crate) fn task_from_row(row: &SqliteRow) -> Result<Task> {
    Ok(Task {
        id: uuid_col(row, "id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        status: enum_col(row, "status")?,
        priority: enum_col(row, "priority")?,
        due_date: row.try_get("due_date")?,
        project_id: opt_uuid_col(row, "project_id")?,
        assignee_id: opt_uuid_col(row, "assignee_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &TaskFilter) {
    qb.push(" WHERE 1 = 1");

    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(priority) = filter.priority {
        qb.push(" AND priority = ").push_bind(priority.as_str());
    }
    if let Some(project_id) = filter.project_id {
        qb.push(" AND project_id = ").push_bind(project_id.to_string());
    }
    if let Some(assignee_id) = filter.assignee_id {
        qb.push(" AND assignee_id = ").push_bind(assignee_id.to_string());
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        qb.push(" AND (title LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR description LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
    match filter.overdue {
        Some(true) => {
            qb.push(" AND due_date IS NOT NULL AND due_date < ")
                .push_bind(to_db(&now()))
                .push(" AND status != 'done'");
        }
        Some(false) => {
            qb.push(" AND (due_date IS NULL OR due_date >= ")
                .push_bind(to_db(&now()))
                .push(" OR status = 'done')");
        }
        None => {}
    }
}

/// List tasks, newest first
pub async fn list_tasks(
    pool: &SqlitePool,
    filter: &TaskFilter,
    page: PageRequest,
) -> Result<(Vec<Task>, i64)> {
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM tasks");
    push_filters(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM tasks", TASK_COLUMNS));
    push_filters(&mut select, filter);
    select
        .push(" ORDER BY created_at DESC, id LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());

    let rows = select.build().fetch_all(pool).await?;
    let tasks = rows.iter().map(task_from_row).collect::<Result<Vec<_>>>()?;

    Ok((tasks, total))
}

pub async fn get_task(pool: &SqlitePool, id: Uuid) -> Result<Option<Task>> {
    let row = sqlx::query(&format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(task_from_row).transpose()
}

/// Task with project and assignee summaries
pub async fn get_task_detail(pool: &SqlitePool, id: Uuid) -> Result<Option<TaskDetail>> {
    let Some(task) = get_task(pool, id).await? else {
        return Ok(None);
    };

    let project = match task.project_id {
        Some(project_id) => project_summary(pool, project_id).await?,
        None => None,
    };
    let assignee = match task.assignee_id {
        Some(assignee_id) => super::contacts::contact_summary(pool, assignee_id).await?,
        None => None,
    };

    Ok(Some(TaskDetail {
        task,
        project,
        assignee,
    }))
}

async fn project_summary(pool: &SqlitePool, id: Uuid) -> Result<Option<ProjectSummary>> {
    let row = sqlx::query("SELECT id, name, status FROM projects WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.map(|row| {
        Ok(ProjectSummary {
            id: uuid_col(&row, "id")?,
            name: row.try_get("name")?,
            status: enum_col(&row, "status")?,
        })
    })
    .transpose()
}

pub(crate) async fn tasks_for_assignee(pool: &SqlitePool, assignee_id: Uuid) -> Result<Vec<Task>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM tasks WHERE assignee_id = ? ORDER BY created_at DESC, id",
        TASK_COLUMNS
    ))
    .bind(assignee_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(task_from_row).collect()
}

pub(crate) async fn tasks_for_project(pool: &SqlitePool, project_id: Uuid) -> Result<Vec<Task>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM tasks WHERE project_id = ? ORDER BY created_at DESC, id",
        TASK_COLUMNS
    ))
    .bind(project_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(task_from_row).collect()
}

pub async fn create_task(pool: &SqlitePool, input: NewTask) -> Result<Task> {
    let id = uuid_utils::generate();
    let timestamp = to_db(&now());

    let row = sqlx::query(&format!(
        r#"
        INSERT INTO tasks (id, title, description, status, priority, due_date, project_id, assignee_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        TASK_COLUMNS
    ))
    .bind(id.to_string())
    .bind(&input.title)
    .bind(&input.description)
    .bind(input.status.as_str())
    .bind(input.priority.as_str())
    .bind(input.due_date.as_ref().map(to_db))
    .bind(input.project_id.map(|v| v.to_string()))
    .bind(input.assignee_id.map(|v| v.to_string()))
    .bind(&timestamp)
    .bind(&timestamp)
    .fetch_one(pool)
    .await?;

    info!("Created task {} '{}'", id, input.title);
    task_from_row(&row)
}

pub async fn update_task(pool: &SqlitePool, id: Uuid, changes: TaskChanges) -> Result<Option<Task>> {
    let mut qb = QueryBuilder::<Sqlite>::new("UPDATE tasks SET updated_at = ");
    qb.push_bind(to_db(&now()));

    if let Some(title) = changes.title {
        qb.push(", title = ").push_bind(title);
    }
    if let Some(description) = changes.description {
        qb.push(", description = ").push_bind(description);
    }
    if let Some(status) = changes.status {
        qb.push(", status = ").push_bind(status.as_str());
    }
    if let Some(priority) = changes.priority {
        qb.push(", priority = ").push_bind(priority.as_str());
    }
    if let Some(due_date) = changes.due_date {
        qb.push(", due_date = ").push_bind(due_date.as_ref().map(to_db));
    }
    if let Some(project_id) = changes.project_id {
        qb.push(", project_id = ").push_bind(project_id.map(|v| v.to_string()));
    }
    if let Some(assignee_id) = changes.assignee_id {
        qb.push(", assignee_id = ").push_bind(assignee_id.map(|v| v.to_string()));
    }

    qb.push(" WHERE id = ")
        .push_bind(id.to_string())
        .push(format!(" RETURNING {}", TASK_COLUMNS));

    let row = qb.build().fetch_optional(pool).await?;
    if row.is_some() {
        info!("Updated task {}", id);
    }
    row.as_ref().map(task_from_row).transpose()
}

/// Move a task to a new workflow state
pub async fn update_task_status(
    pool: &SqlitePool,
    id: Uuid,
    status: TaskStatus,
) -> Result<Option<Task>> {
    let row = sqlx::query(&format!(
        "UPDATE tasks SET status = ?, updated_at = ? WHERE id = ? RETURNING {}",
        TASK_COLUMNS
    ))
    .bind(status.as_str())
    .bind(to_db(&now()))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    if row.is_some() {
        debug!("Task {} -> {}", id, status);
    }
    row.as_ref().map(task_from_row).transpose()
}

pub async fn delete_task(pool: &SqlitePool, id: Uuid) -> Result<Option<Task>> {
    let row = sqlx::query(&format!("DELETE FROM tasks WHERE id = ? RETURNING {}", TASK_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    if row.is_some() {
        info!("Deleted task {}", id);
    }
    row.as_ref().map(task_from_row).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;
    use chrono::Duration;

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: None,
            status: TaskStatus::default(),
            priority: TaskPriority::default(),
            due_date: None,
            project_id: None,
            assignee_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let (_dir, pool) = test_pool().await;
        let task = create_task(&pool, new_task("Write report")).await.unwrap();

        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(get_task(&pool, task.id).await.unwrap(), Some(task));
    }

    #[tokio::test]
    async fn test_unknown_project_is_foreign_key_violation() {
        let (_dir, pool) = test_pool().await;
        let mut input = new_task("Orphan");
        input.project_id = Some(Uuid::new_v4());

        let err = create_task(&pool, input).await.unwrap_err();
        match err {
            taskdesk_common::Error::Database(e) => {
                assert!(e.as_database_error().unwrap().is_foreign_key_violation())
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_status_update_round_trips() {
        let (_dir, pool) = test_pool().await;
        let task = create_task(&pool, new_task("Review PR")).await.unwrap();

        let updated = update_task_status(&pool, task.id, TaskStatus::InProgress)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, TaskStatus::InProgress);

        let reloaded = get_task(&pool, task.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, TaskStatus::InProgress);
        assert!(update_task_status(&pool, Uuid::new_v4(), TaskStatus::Done)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_overdue_filter() {
        let (_dir, pool) = test_pool().await;
        let yesterday = now() - Duration::days(1);

        let mut late = new_task("Late");
        late.due_date = Some(yesterday);
        let late = create_task(&pool, late).await.unwrap();

        let mut finished = new_task("Finished");
        finished.due_date = Some(yesterday);
        finished.status = TaskStatus::Done;
        create_task(&pool, finished).await.unwrap();

        let mut upcoming = new_task("Upcoming");
        upcoming.due_date = Some(now() + Duration::days(3));
        create_task(&pool, upcoming).await.unwrap();

        let filter = TaskFilter {
            overdue: Some(true),
            ..Default::default()
        };
        let (found, total) = list_tasks(&pool, &filter, PageRequest::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].id, late.id);

        let filter = TaskFilter {
            overdue: Some(false),
            ..Default::default()
        };
        let (_, total) = list_tasks(&pool, &filter, PageRequest::default()).await.unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn test_list_filters_and_pages() {
        let (_dir, pool) = test_pool().await;
        for i in 0..5 {
            let mut input = new_task(&format!("Task {}", i));
            if i % 2 == 0 {
                input.priority = TaskPriority::Urgent;
            }
            create_task(&pool, input).await.unwrap();
        }

        let filter = TaskFilter {
            priority: Some(TaskPriority::Urgent),
            ..Default::default()
        };
        let (urgent, total) = list_tasks(&pool, &filter, PageRequest::default()).await.unwrap();
        assert_eq!(total, 3);
        assert!(urgent.iter().all(|t| t.priority == TaskPriority::Urgent));

        let (page, total) = list_tasks(
            &pool,
            &TaskFilter::default(),
            PageRequest { page: 2, limit: 2 },
        )
        .await
        .unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
    }

    #[tokio::test]
    async fn test_update_clears_due_date() {
        let (_dir, pool) = test_pool().await;
        let mut input = new_task("Dated");
        input.due_date = Some(now());
        let task = create_task(&pool, input).await.unwrap();

        let changes = TaskChanges {
            due_date: Some(None),
            ..Default::default()
        };
        let updated = update_task(&pool, task.id, changes).await.unwrap().unwrap();
        assert_eq!(updated.due_date, None);
        assert_eq!(updated.title, "Dated");
    }
}
