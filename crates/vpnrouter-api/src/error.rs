//! JSON:API error responses.
//!
//! Every failure is rendered as
//! `{"errors":[{"code":"<status>","title":"<message>"}]}`.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::server::JSON_API_CONTENT_TYPE;

/// One entry of the `errors` array
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JsonError {
    /// HTTP status as a string, e.g. `"404"`
    pub code: String,
    /// Human readable message
    pub title: String,
}

#[derive(Serialize)]
struct ErrorBody {
    errors: Vec<JsonError>,
}

/// An error that renders as a JSON:API response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    title: String,
}

impl ApiError {
    /// Create an error with an explicit status
    pub fn new(status: StatusCode, title: impl Into<String>) -> Self {
        Self {
            status,
            title: title.into(),
        }
    }

    /// 400 Bad Request
    pub fn bad_request(title: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, title)
    }

    /// 401 Unauthorized
    pub fn unauthorized(title: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, title)
    }

    /// 404 Not Found
    pub fn not_found(title: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, title)
    }

    /// 500 Internal Server Error
    pub fn internal(title: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, title)
    }

    /// HTTP status of this error
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Message of this error
    pub fn title(&self) -> &str {
        &self.title
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            errors: vec![JsonError {
                code: self.status.as_u16().to_string(),
                title: self.title,
            }],
        };
        let mut response = (self.status, axum::Json(body)).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(JSON_API_CONTENT_TYPE),
        );
        response
    }
}
