//! Extractors that deserialize and validate request input before a handler
//! runs, rejecting with [`AppError::Validation`].

use axum::{
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::error::AppError;

/// JSON body deserialized into `T` and checked with [`Validate`].
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;
        value
            .validate()
            .map_err(|errors| AppError::validation(first_violation(&errors)))?;
        Ok(Self(value))
    }
}

/// Query string deserialized into `T` and checked with [`Validate`].
#[derive(Debug, Clone)]
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;
        value
            .validate()
            .map_err(|errors| AppError::validation(first_violation(&errors)))?;
        Ok(Self(value))
    }
}

/// Message of the first violated constraint, fields taken in name order.
///
/// Struct-level checks are reported under `__all__`, which sorts first.
pub fn first_violation(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .find_map(|(field, violations)| {
            violations.first().map(|violation| match &violation.message {
                Some(message) => message.to_string(),
                None => format!("\"{}\" failed the {} check", field, violation.code),
            })
        })
        .unwrap_or_else(|| "invalid request".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, response::IntoResponse, routing::get, Router};
    use http_body_util::BodyExt;
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize, Validate)]
    struct Search {
        #[validate(length(min = 1, message = "\"term\" is not allowed to be empty"))]
        term: String,
        #[validate(range(min = 1, message = "\"page\" must be greater than or equal to 1"))]
        page: Option<i64>,
    }

    async fn search(ValidatedQuery(search): ValidatedQuery<Search>) -> String {
        format!("{}:{}", search.term, search.page.unwrap_or(1))
    }

    async fn submit(ValidatedJson(search): ValidatedJson<Search>) -> impl IntoResponse {
        search.term
    }

    fn app() -> Router {
        Router::new().route("/search", get(search).post(submit))
    }

    async fn call(request: axum::http::Request<Body>) -> (StatusCode, String) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn valid_query_reaches_handler() {
        let request = axum::http::Request::get("/search?term=rust&page=2&extra=ignored")
            .body(Body::empty())
            .unwrap();
        assert_eq!(call(request).await, (StatusCode::OK, "rust:2".to_string()));
    }

    #[tokio::test]
    async fn query_constraint_violation_is_rejected() {
        let request = axum::http::Request::get("/search?term=rust&page=0")
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("greater than or equal to 1"));
    }

    #[tokio::test]
    async fn malformed_query_is_rejected() {
        let request = axum::http::Request::get("/search?term=rust&page=two")
            .body(Body::empty())
            .unwrap();
        let (status, _) = call(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn json_body_is_validated() {
        let request = axum::http::Request::post("/search")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"term": ""}"#))
            .unwrap();
        let (status, body) = call(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("not allowed to be empty"));
    }

    #[tokio::test]
    async fn non_json_body_is_a_validation_error() {
        let request = axum::http::Request::post("/search")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = call(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("validation_error"));
    }

    #[test]
    fn first_violation_prefers_field_name_order() {
        let search = Search {
            term: String::new(),
            page: Some(0),
        };
        let errors = search.validate().unwrap_err();
        assert_eq!(
            first_violation(&errors),
            "\"page\" must be greater than or equal to 1"
        );
    }
}
