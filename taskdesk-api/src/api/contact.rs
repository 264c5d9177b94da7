//! Contact endpoints (`/api/v1/contact`)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use taskdesk_common::api::{ApiResponse, FieldError};
use taskdesk_common::db::{Contact, ContactDetail};

use crate::db::contacts::{self, ContactChanges, ContactFilter, NewContact};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{calculate_pagination, PageRequest};
use crate::validation::{nullable, parse_path_id, FieldErrors, Validate, ValidatedJson, ValidatedQuery};
use crate::AppState;

const NAME_MAX: usize = 100;
const COMPANY_MAX: usize = 100;
const NOTES_MAX: usize = 1000;

/// `GET /` query string
#[derive(Debug, Deserialize)]
pub struct ListContactsQuery {
    pub search: Option<String>,
    pub company: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl Validate for ListContactsQuery {
    type Output = (ContactFilter, PageRequest);

    fn validate(self) -> Result<Self::Output, Vec<FieldError>> {
        let mut errors = FieldErrors::new();
        let filter = ContactFilter {
            search: errors.optional_text("search", self.search, NAME_MAX),
            company: errors.optional_text("company", self.company, COMPANY_MAX),
        };
        let page = errors.page(self.page, self.limit);
        errors.finish((filter, page))
    }
}

/// `POST /` body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactBody {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub notes: Option<String>,
}

impl Validate for CreateContactBody {
    type Output = NewContact;

    fn validate(self) -> Result<NewContact, Vec<FieldError>> {
        let mut errors = FieldErrors::new();
        let contact = NewContact {
            first_name: errors.required_text("firstName", self.first_name, NAME_MAX),
            last_name: errors.required_text("lastName", self.last_name, NAME_MAX),
            email: errors.email("email", self.email),
            phone: errors.phone("phone", self.phone),
            company: errors.optional_text("company", self.company, COMPANY_MAX),
            notes: errors.optional_text("notes", self.notes, NOTES_MAX),
        };
        errors.finish(contact)
    }
}

/// `PUT /:id` body; every field optional, `null` clears nullable columns
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContactBody {
    #[serde(default, deserialize_with = "nullable")]
    pub first_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub last_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub company: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

impl Validate for UpdateContactBody {
    type Output = ContactChanges;

    fn validate(self) -> Result<ContactChanges, Vec<FieldError>> {
        let mut errors = FieldErrors::new();
        let changes = ContactChanges {
            first_name: errors.present_text("firstName", self.first_name, NAME_MAX),
            last_name: errors.present_text("lastName", self.last_name, NAME_MAX),
            email: errors.present_email("email", self.email),
            phone: errors.nullable_phone("phone", self.phone),
            company: errors.nullable_text("company", self.company, COMPANY_MAX),
            notes: errors.nullable_text("notes", self.notes, NOTES_MAX),
        };

        if changes.first_name.is_none()
            && changes.last_name.is_none()
            && changes.email.is_none()
            && changes.phone.is_none()
            && changes.company.is_none()
            && changes.notes.is_none()
            && errors.is_empty()
        {
            errors.add("body", super::EMPTY_UPDATE_MESSAGE);
        }

        errors.finish(changes)
    }
}

/// GET /api/v1/contact
pub async fn list_contacts(
    State(state): State<AppState>,
    ValidatedQuery((filter, page)): ValidatedQuery<ListContactsQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Contact>>>> {
    let (contacts, total) = contacts::list_contacts(&state.db, &filter, page).await?;

    Ok(Json(
        ApiResponse::ok(contacts, "Contacts retrieved successfully")
            .with_pagination(calculate_pagination(total, page)),
    ))
}

/// GET /api/v1/contact/:id
pub async fn get_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<ContactDetail>>> {
    let id = parse_path_id("id", &id)?;
    let detail = contacts::get_contact_detail(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Contact"))?;

    Ok(Json(ApiResponse::ok(detail, "Contact retrieved successfully")))
}

/// POST /api/v1/contact
pub async fn create_contact(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateContactBody>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Contact>>)> {
    let contact = contacts::create_contact(&state.db, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(contact, "Contact created successfully")),
    ))
}

/// PUT /api/v1/contact/:id
pub async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(changes): ValidatedJson<UpdateContactBody>,
) -> ApiResult<Json<ApiResponse<Contact>>> {
    let id = parse_path_id("id", &id)?;
    let contact = contacts::update_contact(&state.db, id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("Contact"))?;

    Ok(Json(ApiResponse::ok(contact, "Contact updated successfully")))
}

/// DELETE /api/v1/contact/:id
pub async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Contact>>> {
    let id = parse_path_id("id", &id)?;
    let contact = contacts::delete_contact(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Contact"))?;

    Ok(Json(ApiResponse::ok(contact, "Contact deleted successfully")))
}

/// Build contact routes
pub fn contact_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_contacts).post(create_contact))
        .route(
            "/:id",
            get(get_contact).put(update_contact).delete(delete_contact),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(json: &str) -> UpdateContactBody {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_create_reports_every_failing_field() {
        let dto: CreateContactBody =
            serde_json::from_str(r#"{"firstName": " ", "email": "nope", "phone": "call me"}"#).unwrap();
        let errors = dto.validate().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["firstName", "lastName", "email", "phone"]);
    }

    #[test]
    fn test_create_ignores_unknown_fields() {
        let dto: CreateContactBody = serde_json::from_str(
            r#"{"firstName": "Ada", "lastName": "Lovelace", "email": "ADA@example.com", "id": "x", "isAdmin": true}"#,
        )
        .unwrap();
        let contact = dto.validate().unwrap();
        assert_eq!(contact.email, "ada@example.com");
    }

    #[test]
    fn test_update_requires_a_field() {
        let errors = body("{}").validate().unwrap_err();
        assert_eq!(errors[0].field, "body");
    }

    #[test]
    fn test_update_null_clears_optional_but_not_required() {
        let changes = body(r#"{"company": null}"#).validate().unwrap();
        assert_eq!(changes.company, Some(None));

        let errors = body(r#"{"lastName": null}"#).validate().unwrap_err();
        assert_eq!(errors[0].field, "lastName");
    }
}
