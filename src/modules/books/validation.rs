//! Request payloads for the books routes and the checks they must pass
//! before anything reaches the store.

use std::borrow::Cow;

use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use libris_http::AppError;
use serde::{Deserialize, Deserializer};
use validator::{Validate, ValidationError};

use super::models::{BookChanges, BookFilter, BookId, NewBook, Window};

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;

/// Body of `POST /books`. Every field is required and unknown fields are
/// rejected, so an `id` can never be supplied.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateBookRequest {
    #[validate(length(min = 1, message = "\"name\" is not allowed to be empty"))]
    pub name: String,
    #[validate(length(min = 1, message = "\"description\" is not allowed to be empty"))]
    pub description: String,
    #[serde(deserialize_with = "iso_date::deserialize")]
    pub publish_date: DateTime<Utc>,
    #[validate(range(exclusive_min = 0.0, message = "\"price\" must be a positive number"))]
    pub price: f64,
}

impl From<CreateBookRequest> for NewBook {
    fn from(request: CreateBookRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            publish_date: request.publish_date,
            price: request.price,
        }
    }
}

/// Body of `PUT /books/{id}`. Unknown fields are dropped; at least one known
/// field must be present.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "has_recognized_field"))]
pub struct UpdateBookRequest {
    #[serde(default, deserialize_with = "non_null")]
    #[validate(length(min = 1, message = "\"name\" is not allowed to be empty"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "non_null")]
    #[validate(length(min = 1, message = "\"description\" is not allowed to be empty"))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "iso_date::deserialize_option")]
    pub publish_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "non_null")]
    #[validate(range(exclusive_min = 0.0, message = "\"price\" must be a positive number"))]
    pub price: Option<f64>,
}

/// Optional field that, when sent, must carry a value; `null` is a type error.
fn non_null<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn has_recognized_field(request: &UpdateBookRequest) -> Result<(), ValidationError> {
    if request.name.is_none()
        && request.description.is_none()
        && request.publish_date.is_none()
        && request.price.is_none()
    {
        return Err(ValidationError::new("min_fields").with_message(Cow::Borrowed(
            "\"value\" must have at least 1 of name, description, publishDate, price",
        )));
    }
    Ok(())
}

impl From<UpdateBookRequest> for BookChanges {
    fn from(request: UpdateBookRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            publish_date: request.publish_date,
            price: request.price,
        }
    }
}

/// Query string of `GET /books`. Unknown parameters are dropped.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListBooksQuery {
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1, message = "\"page\" must be greater than or equal to 1"))]
    pub page: Option<i64>,
    #[validate(range(min = 1, message = "\"limit\" must be greater than or equal to 1"))]
    pub limit: Option<i64>,
}

impl ListBooksQuery {
    pub fn filter(&self) -> BookFilter {
        BookFilter {
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }

    /// `skip = (page - 1) * limit`, `take = limit`.
    pub fn window(&self) -> Result<Window, AppError> {
        let page = self.page.unwrap_or(DEFAULT_PAGE);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        let skip = (page - 1)
            .checked_mul(limit)
            .ok_or_else(|| AppError::validation("\"page\" is too large for the given \"limit\""))?;
        Ok(Window { skip, take: limit })
    }
}

/// Numeric `{id}` path segment; anything else is `InvalidIdentifier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathId(pub BookId);

impl std::str::FromStr for PathId {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        raw.parse::<BookId>()
            .map(PathId)
            .map_err(|_| AppError::invalid_identifier("Invalid book ID"))
    }
}

impl<S> FromRequestParts<S> for PathId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::invalid_identifier("Invalid book ID"))?;
        raw.parse()
    }
}

/// ISO-8601 dates: `2024-05-01`, `2024-05-01T10:00:00`, or full RFC 3339.
/// Date-only and zone-less values are taken as UTC.
mod iso_date {
    use super::*;

    const MESSAGE: &str = "\"publishDate\" must be in ISO 8601 date format";

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(date_time) = DateTime::parse_from_rfc3339(raw) {
            return Some(date_time.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(naive.and_utc());
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(MESSAGE))
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Absent fields never reach here; an explicit `null` is rejected.
        deserialize(deserializer).map(Some)
    }
}
