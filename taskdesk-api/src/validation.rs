//! Request validation
//!
//! Request bodies and query strings are first deserialized into loosely
//! typed DTOs (everything optional, strings for enums / dates / ids) and
//! then run through [`Validate`], which checks every rule, collects every
//! failing field and produces the strongly typed input the services take.
//! Unknown fields are ignored, so they never reach the database.

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Query, Request,
    },
    http::request::Parts,
    Json,
};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;
use taskdesk_common::api::FieldError;
use uuid::Uuid;

use crate::error::ApiError;
use crate::pagination::{PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Schema for one request shape
pub trait Validate: Sized {
    /// Strongly typed result of a successful validation
    type Output;

    fn validate(self) -> Result<Self::Output, Vec<FieldError>>;
}

/// JSON body extractor that validates before the handler runs
pub struct ValidatedJson<T: Validate>(pub T::Output);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: Validate + DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(dto) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        dto.validate().map(|output| Self(output)).map_err(ApiError::Validation)
    }
}

/// Query string extractor that validates before the handler runs
pub struct ValidatedQuery<T: Validate>(pub T::Output);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: Validate + DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(dto) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(query_rejection)?;
        dto.validate().map(|output| Self(output)).map_err(ApiError::Validation)
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::JsonDataError(err) => ApiError::field("body", err.body_text()),
        JsonRejection::JsonSyntaxError(err) => {
            ApiError::BadRequest(format!("Malformed JSON body: {}", err.body_text()))
        }
        other => ApiError::BadRequest(other.body_text()),
    }
}

fn query_rejection(rejection: QueryRejection) -> ApiError {
    ApiError::field("query", rejection.body_text())
}

/// Parse a path segment as a record id
pub fn parse_path_id(field: &str, raw: &str) -> Result<Uuid, ApiError> {
    taskdesk_common::uuid_utils::parse(raw)
        .map_err(|_| ApiError::field(field, format!("'{}' is not a valid id", raw)))
}

/// `Option<Option<T>>` deserializer: absent → `None`, `null` → `Some(None)`
///
/// Use with `#[serde(default, deserialize_with = "nullable")]`.
pub fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ========================================
// Rule collector
// ========================================

/// Accumulates field errors while converting DTO fields
#[derive(Debug, Default)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(value)` when no rule failed
    pub fn finish<T>(self, value: T) -> Result<T, Vec<FieldError>> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(self.0)
        }
    }

    /// Required, trimmed, non-empty text of at most `max` characters
    pub fn required_text(&mut self, field: &str, value: Option<String>, max: usize) -> String {
        match value.map(|v| v.trim().to_string()) {
            Some(v) if !v.is_empty() => {
                self.check_len(field, &v, max);
                v
            }
            _ => {
                self.add(field, "is required");
                String::new()
            }
        }
    }

    /// Optional text; blank becomes `None`
    pub fn optional_text(&mut self, field: &str, value: Option<String>, max: usize) -> Option<String> {
        let v = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())?;
        self.check_len(field, &v, max);
        Some(v)
    }

    /// Update of a required text column: absent leaves it, `null` or blank is rejected
    pub fn present_text(
        &mut self,
        field: &str,
        value: Option<Option<String>>,
        max: usize,
    ) -> Option<String> {
        value.map(|inner| self.required_text(field, inner, max))
    }

    /// Update of a nullable text column; blank clears it
    pub fn nullable_text(
        &mut self,
        field: &str,
        value: Option<Option<String>>,
        max: usize,
    ) -> Option<Option<String>> {
        value.map(|inner| self.optional_text(field, inner, max))
    }

    /// Email address, lower-cased
    pub fn email(&mut self, field: &str, value: Option<String>) -> String {
        let email = self.required_text(field, value, 255).to_lowercase();
        if !email.is_empty() && !looks_like_email(&email) {
            self.add(field, "must be a valid email address");
        }
        email
    }

    /// Email update: absent leaves it alone, present must be valid
    pub fn present_email(&mut self, field: &str, value: Option<Option<String>>) -> Option<String> {
        value.map(|inner| self.email(field, inner))
    }

    /// Phone number: digits plus `+ - ( ) .` and spaces, at least 5 digits
    pub fn phone(&mut self, field: &str, value: Option<String>) -> Option<String> {
        let phone = self.optional_text(field, value, 30)?;
        if !looks_like_phone(&phone) {
            self.add(field, "must be a valid phone number");
        }
        Some(phone)
    }

    /// Nullable phone update
    pub fn nullable_phone(
        &mut self,
        field: &str,
        value: Option<Option<String>>,
    ) -> Option<Option<String>> {
        value.map(|inner| self.phone(field, inner))
    }

    /// One of a closed set of values
    pub fn choice<E>(&mut self, field: &str, value: Option<String>) -> Option<E>
    where
        E: FromStr,
        E::Err: std::fmt::Display,
    {
        let raw = value?;
        match raw.trim().parse::<E>() {
            Ok(v) => Some(v),
            Err(e) => {
                self.add(field, e.to_string());
                None
            }
        }
    }

    /// Timestamp (RFC 3339 or `YYYY-MM-DD`)
    pub fn date(&mut self, field: &str, value: Option<String>) -> Option<DateTime<Utc>> {
        let raw = value.filter(|v| !v.trim().is_empty())?;
        match taskdesk_common::time::parse_timestamp(&raw) {
            Some(ts) => Some(ts),
            None => {
                self.add(field, "must be an ISO 8601 date or date-time");
                None
            }
        }
    }

    /// Nullable timestamp update
    pub fn nullable_date(
        &mut self,
        field: &str,
        value: Option<Option<String>>,
    ) -> Option<Option<DateTime<Utc>>> {
        value.map(|inner| self.date(field, inner))
    }

    /// Reference to another record
    pub fn reference(&mut self, field: &str, value: Option<String>) -> Option<Uuid> {
        let raw = value.filter(|v| !v.trim().is_empty())?;
        match taskdesk_common::uuid_utils::parse(raw.trim()) {
            Ok(id) => Some(id),
            Err(_) => {
                self.add(field, "must be a valid id");
                None
            }
        }
    }

    /// Required reference to another record
    pub fn required_reference(&mut self, field: &str, value: Option<String>) -> Option<Uuid> {
        if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
            self.add(field, "is required");
            return None;
        }
        self.reference(field, value)
    }

    /// Nullable reference update
    pub fn nullable_reference(
        &mut self,
        field: &str,
        value: Option<Option<String>>,
    ) -> Option<Option<Uuid>> {
        value.map(|inner| self.reference(field, inner))
    }

    /// `true` / `false` (also `1` / `0`)
    pub fn flag(&mut self, field: &str, value: Option<String>) -> Option<bool> {
        let raw = value?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => {
                self.add(field, "must be true or false");
                None
            }
        }
    }

    /// `page` / `limit` query parameters
    pub fn page(&mut self, page: Option<String>, limit: Option<String>) -> PageRequest {
        let page = match page.as_deref().map(str::trim) {
            None | Some("") => 1,
            Some(raw) => match raw.parse::<i64>() {
                Ok(p) if p >= 1 => p,
                _ => {
                    self.add("page", "must be a whole number of at least 1");
                    1
                }
            },
        };

        let limit = match limit.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_PAGE_SIZE,
            Some(raw) => match raw.parse::<i64>() {
                Ok(l) if (1..=MAX_PAGE_SIZE).contains(&l) => l,
                _ => {
                    self.add(
                        "limit",
                        format!("must be a whole number between 1 and {}", MAX_PAGE_SIZE),
                    );
                    DEFAULT_PAGE_SIZE
                }
            },
        };

        if (page - 1).checked_mul(limit).is_none() {
            self.add("page", "is too large");
            return PageRequest { page: 1, limit };
        }

        PageRequest { page, limit }
    }

    fn check_len(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(field, format!("must be at most {} characters", max));
        }
    }
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
}

fn looks_like_phone(phone: &str) -> bool {
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | '.' | ' '));
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    allowed && digits >= 5
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskdesk_common::db::TaskStatus;

    #[test]
    fn test_required_text_trims_and_rejects_blank() {
        let mut errors = FieldErrors::new();
        assert_eq!(errors.required_text("title", Some("  Ship it ".into()), 10), "Ship it");
        errors.required_text("name", Some("   ".into()), 10);
        errors.required_text("other", None, 10);

        let fields: Vec<_> = errors.0.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "other"]);
    }

    #[test]
    fn test_length_limit_counts_characters() {
        let mut errors = FieldErrors::new();
        errors.required_text("name", Some("ééé".into()), 3);
        assert!(errors.is_empty());
        errors.required_text("name", Some("éééé".into()), 3);
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_email_rules() {
        for good in ["ada@example.com", "A.B+tag@mail.example.org"] {
            let mut errors = FieldErrors::new();
            errors.email("email", Some(good.into()));
            assert!(errors.is_empty(), "{} should be accepted", good);
        }
        for bad in ["ada", "ada@", "@example.com", "ada@example", "a b@example.com", "a@b@c.com"] {
            let mut errors = FieldErrors::new();
            errors.email("email", Some(bad.into()));
            assert!(!errors.is_empty(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_email_is_lowercased() {
        let mut errors = FieldErrors::new();
        assert_eq!(errors.email("email", Some("Ada@Example.COM".into())), "ada@example.com");
    }

    #[test]
    fn test_phone_rules() {
        let mut errors = FieldErrors::new();
        assert_eq!(
            errors.phone("phone", Some("+1 (555) 010-9999".into())).as_deref(),
            Some("+1 (555) 010-9999")
        );
        assert!(errors.is_empty());
        errors.phone("phone", Some("call me".into()));
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_nullable_text_distinguishes_clear_from_absent() {
        let mut errors = FieldErrors::new();
        assert_eq!(errors.nullable_text("notes", None, 10), None);
        assert_eq!(errors.nullable_text("notes", Some(None), 10), Some(None));
        assert_eq!(errors.nullable_text("notes", Some(Some(" ".into())), 10), Some(None));
        assert_eq!(
            errors.nullable_text("notes", Some(Some("hi".into())), 10),
            Some(Some("hi".to_string()))
        );
    }

    #[test]
    fn test_choice_reports_expected_values() {
        let mut errors = FieldErrors::new();
        assert_eq!(
            errors.choice::<TaskStatus>("status", Some("done".into())),
            Some(TaskStatus::Done)
        );
        assert_eq!(errors.choice::<TaskStatus>("status", Some("later".into())), None);
        let err = errors.finish(()).unwrap_err();
        assert_eq!(err[0].field, "status");
        assert!(err[0].message.contains("in_progress"));
    }

    #[test]
    fn test_page_defaults_and_bounds() {
        let mut errors = FieldErrors::new();
        let page = errors.page(None, None);
        assert_eq!((page.page, page.limit), (1, DEFAULT_PAGE_SIZE));

        errors.page(Some("0".into()), Some("1000".into()));
        let fields: Vec<_> = errors.0.iter().map(|e| e.field.clone()).collect();
        assert_eq!(fields, vec!["page", "limit"]);
    }

    #[test]
    fn test_page_whose_offset_overflows_is_rejected() {
        let mut errors = FieldErrors::new();
        let page = errors.page(Some(i64::MAX.to_string()), Some("20".into()));
        assert_eq!(page.offset(), 0);
        assert_eq!(errors.0.len(), 1);
        assert_eq!(errors.0[0].field, "page");

        let mut errors = FieldErrors::new();
        errors.page(Some("1000000".into()), Some("100".into()));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_reference_and_flag() {
        let mut errors = FieldErrors::new();
        let id = Uuid::new_v4();
        assert_eq!(errors.reference("projectId", Some(id.to_string())), Some(id));
        assert_eq!(errors.flag("overdue", Some("TRUE".into())), Some(true));
        assert!(errors.is_empty());

        errors.reference("projectId", Some("42".into()));
        errors.flag("overdue", Some("maybe".into()));
        assert_eq!(errors.0.len(), 2);
    }

    #[test]
    fn test_nullable_deserializer() {
        #[derive(Deserialize)]
        struct Body {
            #[serde(default, deserialize_with = "nullable")]
            notes: Option<Option<String>>,
        }

        let absent: Body = serde_json::from_str("{}").unwrap();
        let null: Body = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        let set: Body = serde_json::from_str(r#"{"notes": "x"}"#).unwrap();

        assert_eq!(absent.notes, None);
        assert_eq!(null.notes, Some(None));
        assert_eq!(set.notes, Some(Some("x".to_string())));
    }
}
