//! Success response shapes.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Wraps a successful payload as `{"data": ...}`.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn envelope_wraps_payload_under_data() {
        let response = Envelope::new(vec![1, 2, 3]).into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json, serde_json::json!({ "data": [1, 2, 3] }));
    }
}
