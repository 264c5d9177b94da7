//! Task endpoints (`/api/v1/task`)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use taskdesk_common::api::{ApiResponse, FieldError};
use taskdesk_common::db::{Task, TaskDetail, TaskStatus};

use crate::db::tasks::{self, NewTask, TaskChanges, TaskFilter};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{calculate_pagination, PageRequest};
use crate::validation::{nullable, parse_path_id, FieldErrors, Validate, ValidatedJson, ValidatedQuery};
use crate::AppState;

const TITLE_MAX: usize = 200;
const DESCRIPTION_MAX: usize = 2000;

/// `GET /` query string
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub project_id: Option<String>,
    pub assignee_id: Option<String>,
    pub search: Option<String>,
    pub overdue: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl Validate for ListTasksQuery {
    type Output = (TaskFilter, PageRequest);

    fn validate(self) -> Result<Self::Output, Vec<FieldError>> {
        let mut errors = FieldErrors::new();
        let filter = TaskFilter {
            status: errors.choice("status", self.status),
            priority: errors.choice("priority", self.priority),
            project_id: errors.reference("projectId", self.project_id),
            assignee_id: errors.reference("assigneeId", self.assignee_id),
            search: errors.optional_text("search", self.search, TITLE_MAX),
            overdue: errors.flag("overdue", self.overdue),
        };
        let page = errors.page(self.page, self.limit);
        errors.finish((filter, page))
    }
}

/// `POST /` body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskBody {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
    pub project_id: Option<String>,
    pub assignee_id: Option<String>,
}

impl Validate for CreateTaskBody {
    type Output = NewTask;

    fn validate(self) -> Result<NewTask, Vec<FieldError>> {
        let mut errors = FieldErrors::new();
        let task = NewTask {
            title: errors.required_text("title", self.title, TITLE_MAX),
            description: errors.optional_text("description", self.description, DESCRIPTION_MAX),
            status: errors.choice("status", self.status).unwrap_or_default(),
            priority: errors.choice("priority", self.priority).unwrap_or_default(),
            due_date: errors.date("dueDate", self.due_date),
            project_id: errors.reference("projectId", self.project_id),
            assignee_id: errors.reference("assigneeId", self.assignee_id),
        };
        errors.finish(task)
    }
}

/// `PUT /:id` body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskBody {
    #[serde(default, deserialize_with = "nullable")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub status: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub priority: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub due_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub project_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub assignee_id: Option<Option<String>>,
}

impl Validate for UpdateTaskBody {
    type Output = TaskChanges;

    fn validate(self) -> Result<TaskChanges, Vec<FieldError>> {
        let mut errors = FieldErrors::new();
        let changes = TaskChanges {
            title: errors.present_text("title", self.title, TITLE_MAX),
            description: errors.nullable_text("description", self.description, DESCRIPTION_MAX),
            status: required_choice(&mut errors, "status", self.status),
            priority: required_choice(&mut errors, "priority", self.priority),
            due_date: errors.nullable_date("dueDate", self.due_date),
            project_id: errors.nullable_reference("projectId", self.project_id),
            assignee_id: errors.nullable_reference("assigneeId", self.assignee_id),
        };

        if changes.title.is_none()
            && changes.description.is_none()
            && changes.status.is_none()
            && changes.priority.is_none()
            && changes.due_date.is_none()
            && changes.project_id.is_none()
            && changes.assignee_id.is_none()
            && errors.is_empty()
        {
            errors.add("body", super::EMPTY_UPDATE_MESSAGE);
        }

        errors.finish(changes)
    }
}

/// `PATCH /:id/status` body
#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub status: Option<String>,
}

impl Validate for UpdateStatusBody {
    type Output = TaskStatus;

    fn validate(self) -> Result<TaskStatus, Vec<FieldError>> {
        let mut errors = FieldErrors::new();
        let status = match self.status {
            Some(raw) => errors.choice::<TaskStatus>("status", Some(raw)),
            None => {
                errors.add("status", "is required");
                None
            }
        };
        errors.finish(status.unwrap_or_default())
    }
}

/// Enum column that may be changed but never cleared
fn required_choice<E>(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<Option<String>>,
) -> Option<E>
where
    E: std::str::FromStr,
    E::Err: std::fmt::Display,
{
    match value? {
        Some(raw) => errors.choice(field, Some(raw)),
        None => {
            errors.add(field, "cannot be null");
            None
        }
    }
}

/// GET /api/v1/task
pub async fn list_tasks(
    State(state): State<AppState>,
    ValidatedQuery((filter, page)): ValidatedQuery<ListTasksQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Task>>>> {
    let (tasks, total) = tasks::list_tasks(&state.db, &filter, page).await?;

    Ok(Json(
        ApiResponse::ok(tasks, "Tasks retrieved successfully")
            .with_pagination(calculate_pagination(total, page)),
    ))
}

/// GET /api/v1/task/:id
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<TaskDetail>>> {
    let id = parse_path_id("id", &id)?;
    let detail = tasks::get_task_detail(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task"))?;

    Ok(Json(ApiResponse::ok(detail, "Task retrieved successfully")))
}

/// POST /api/v1/task
pub async fn create_task(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateTaskBody>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Task>>)> {
    let task = tasks::create_task(&state.db, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(task, "Task created successfully")),
    ))
}

/// PUT /api/v1/task/:id
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(changes): ValidatedJson<UpdateTaskBody>,
) -> ApiResult<Json<ApiResponse<Task>>> {
    let id = parse_path_id("id", &id)?;
    let task = tasks::update_task(&state.db, id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("Task"))?;

    Ok(Json(ApiResponse::ok(task, "Task updated successfully")))
}

/// PATCH /api/v1/task/:id/status
pub async fn update_task_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(status): ValidatedJson<UpdateStatusBody>,
) -> ApiResult<Json<ApiResponse<Task>>> {
    let id = parse_path_id("id", &id)?;
    let task = tasks::update_task_status(&state.db, id, status)
        .await?
        .ok_or_else(|| ApiError::not_found("Task"))?;

    Ok(Json(ApiResponse::ok(task, "Task status updated successfully")))
}

/// DELETE /api/v1/task/:id
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Task>>> {
    let id = parse_path_id("id", &id)?;
    let task = tasks::delete_task(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task"))?;

    Ok(Json(ApiResponse::ok(task, "Task deleted successfully")))
}

/// Build task routes
pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/:id", get(get_task).put(update_task).delete(delete_task))
        .route("/:id/status", patch(update_task_status))
}
