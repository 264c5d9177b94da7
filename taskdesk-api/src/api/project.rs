//! Project endpoints (`/api/v1/project`), including membership management

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use taskdesk_common::api::{ApiResponse, FieldError};
use taskdesk_common::db::{MemberEntry, Project, ProjectDetail, ProjectListItem, DEFAULT_MEMBER_ROLE};
use uuid::Uuid;

use crate::db::members;
use crate::db::projects::{self, NewProject, ProjectChanges, ProjectFilter, ProjectUpdate};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{calculate_pagination, PageRequest};
use crate::validation::{nullable, parse_path_id, FieldErrors, Validate, ValidatedJson, ValidatedQuery};
use crate::AppState;

const NAME_MAX: usize = 150;
const DESCRIPTION_MAX: usize = 2000;
const ROLE_MAX: usize = 50;

const END_BEFORE_START: &str = "must be on or after startDate";

/// `GET /` query string
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProjectsQuery {
    pub status: Option<String>,
    pub owner_id: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl Validate for ListProjectsQuery {
    type Output = (ProjectFilter, PageRequest);

    fn validate(self) -> Result<Self::Output, Vec<FieldError>> {
        let mut errors = FieldErrors::new();
        let filter = ProjectFilter {
            status: errors.choice("status", self.status),
            owner_id: errors.reference("ownerId", self.owner_id),
            search: errors.optional_text("search", self.search, NAME_MAX),
        };
        let page = errors.page(self.page, self.limit);
        errors.finish((filter, page))
    }
}

/// `POST /` body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub owner_id: Option<String>,
}

impl Validate for CreateProjectBody {
    type Output = NewProject;

    fn validate(self) -> Result<NewProject, Vec<FieldError>> {
        let mut errors = FieldErrors::new();
        let project = NewProject {
            name: errors.required_text("name", self.name, NAME_MAX),
            description: errors.optional_text("description", self.description, DESCRIPTION_MAX),
            status: errors.choice("status", self.status).unwrap_or_default(),
            start_date: errors.date("startDate", self.start_date),
            end_date: errors.date("endDate", self.end_date),
            owner_id: errors.reference("ownerId", self.owner_id),
        };

        if !dates_in_order(project.start_date, project.end_date) {
            errors.add("endDate", END_BEFORE_START);
        }

        errors.finish(project)
    }
}

/// `PUT /:id` body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectBody {
    #[serde(default, deserialize_with = "nullable")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub status: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub start_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub end_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub owner_id: Option<Option<String>>,
}

impl Validate for UpdateProjectBody {
    type Output = ProjectChanges;

    fn validate(self) -> Result<ProjectChanges, Vec<FieldError>> {
        let mut errors = FieldErrors::new();

        let status = match self.status {
            Some(Some(raw)) => errors.choice("status", Some(raw)),
            Some(None) => {
                errors.add("status", "cannot be null");
                None
            }
            None => None,
        };

        let changes = ProjectChanges {
            name: errors.present_text("name", self.name, NAME_MAX),
            description: errors.nullable_text("description", self.description, DESCRIPTION_MAX),
            status,
            start_date: errors.nullable_date("startDate", self.start_date),
            end_date: errors.nullable_date("endDate", self.end_date),
            owner_id: errors.nullable_reference("ownerId", self.owner_id),
        };

        if let (Some(start), Some(end)) = (changes.start_date, changes.end_date) {
            if !dates_in_order(start, end) {
                errors.add("endDate", END_BEFORE_START);
            }
        }

        if changes.name.is_none()
            && changes.description.is_none()
            && changes.status.is_none()
            && changes.start_date.is_none()
            && changes.end_date.is_none()
            && changes.owner_id.is_none()
            && errors.is_empty()
        {
            errors.add("body", super::EMPTY_UPDATE_MESSAGE);
        }

        errors.finish(changes)
    }
}

/// `POST /:id/members` body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberBody {
    pub contact_id: Option<String>,
    pub role: Option<String>,
}

/// Validated membership request
#[derive(Debug, Clone)]
pub struct NewMember {
    pub contact_id: Uuid,
    pub role: String,
}

impl Validate for AddMemberBody {
    type Output = NewMember;

    fn validate(self) -> Result<NewMember, Vec<FieldError>> {
        let mut errors = FieldErrors::new();
        let contact_id = errors.required_reference("contactId", self.contact_id);
        let role = errors
            .optional_text("role", self.role, ROLE_MAX)
            .unwrap_or_else(|| DEFAULT_MEMBER_ROLE.to_string());

        errors.finish(NewMember {
            contact_id: contact_id.unwrap_or_default(),
            role,
        })
    }
}

/// `PATCH /:id/members/:contactId` body
#[derive(Debug, Deserialize)]
pub struct UpdateMemberBody {
    pub role: Option<String>,
}

impl Validate for UpdateMemberBody {
    type Output = String;

    fn validate(self) -> Result<String, Vec<FieldError>> {
        let mut errors = FieldErrors::new();
        let role = errors.required_text("role", self.role, ROLE_MAX);
        errors.finish(role)
    }
}

fn dates_in_order(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> bool {
    match (start, end) {
        (Some(start), Some(end)) => end >= start,
        _ => true,
    }
}

/// GET /api/v1/project
pub async fn list_projects(
    State(state): State<AppState>,
    ValidatedQuery((filter, page)): ValidatedQuery<ListProjectsQuery>,
) -> ApiResult<Json<ApiResponse<Vec<ProjectListItem>>>> {
    let (items, total) = projects::list_projects(&state.db, &filter, page).await?;

    Ok(Json(
        ApiResponse::ok(items, "Projects retrieved successfully")
            .with_pagination(calculate_pagination(total, page)),
    ))
}

/// GET /api/v1/project/:id
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<ProjectDetail>>> {
    let id = parse_path_id("id", &id)?;
    let detail = projects::get_project_detail(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project"))?;

    Ok(Json(ApiResponse::ok(detail, "Project retrieved successfully")))
}

/// POST /api/v1/project
pub async fn create_project(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateProjectBody>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Project>>)> {
    let project = projects::create_project(&state.db, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(project, "Project created successfully")),
    ))
}

/// PUT /api/v1/project/:id
///
/// A partial date change is checked against the stored counterpart.
pub async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(changes): ValidatedJson<UpdateProjectBody>,
) -> ApiResult<Json<ApiResponse<Project>>> {
    let id = parse_path_id("id", &id)?;

    match projects::update_project(&state.db, id, changes).await? {
        ProjectUpdate::Updated(project) => {
            Ok(Json(ApiResponse::ok(project, "Project updated successfully")))
        }
        ProjectUpdate::NotFound => Err(ApiError::not_found("Project")),
        ProjectUpdate::DatesOutOfOrder => Err(ApiError::field("endDate", END_BEFORE_START)),
    }
}

/// DELETE /api/v1/project/:id
pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Project>>> {
    let id = parse_path_id("id", &id)?;
    let project = projects::delete_project(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project"))?;

    Ok(Json(ApiResponse::ok(project, "Project deleted successfully")))
}

/// GET /api/v1/project/:id/members
pub async fn list_members(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Vec<MemberEntry>>>> {
    let id = parse_path_id("id", &id)?;
    if !projects::project_exists(&state.db, id).await? {
        return Err(ApiError::not_found("Project"));
    }

    let members = members::list_members(&state.db, id).await?;
    Ok(Json(ApiResponse::ok(members, "Members retrieved successfully")))
}

/// POST /api/v1/project/:id/members
pub async fn add_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(input): ValidatedJson<AddMemberBody>,
) -> ApiResult<(StatusCode, Json<ApiResponse<MemberEntry>>)> {
    let id = parse_path_id("id", &id)?;
    if !projects::project_exists(&state.db, id).await? {
        return Err(ApiError::not_found("Project"));
    }

    let member = members::add_member(&state.db, id, input.contact_id, &input.role).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(member, "Member added successfully")),
    ))
}

/// PATCH /api/v1/project/:id/members/:contactId
pub async fn update_member(
    State(state): State<AppState>,
    Path((id, contact_id)): Path<(String, String)>,
    ValidatedJson(role): ValidatedJson<UpdateMemberBody>,
) -> ApiResult<Json<ApiResponse<MemberEntry>>> {
    let id = parse_path_id("id", &id)?;
    let contact_id = parse_path_id("contactId", &contact_id)?;

    let member = members::update_member_role(&state.db, id, contact_id, &role)
        .await?
        .ok_or_else(|| ApiError::not_found("Member"))?;

    Ok(Json(ApiResponse::ok(member, "Member updated successfully")))
}

/// DELETE /api/v1/project/:id/members/:contactId
pub async fn remove_member(
    State(state): State<AppState>,
    Path((id, contact_id)): Path<(String, String)>,
) -> ApiResult<Json<ApiResponse<MemberEntry>>> {
    let id = parse_path_id("id", &id)?;
    let contact_id = parse_path_id("contactId", &contact_id)?;

    let member = members::remove_member(&state.db, id, contact_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Member"))?;

    Ok(Json(ApiResponse::ok(member, "Member removed successfully")))
}

/// Build project routes
pub fn project_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route(
            "/:id",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/:id/members", get(list_members).post(add_member))
        .route(
            "/:id/members/:contact_id",
            patch(update_member).delete(remove_member),
        )
}
