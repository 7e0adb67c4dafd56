use std::collections::BTreeMap;

use axum::http::header::{HeaderValue, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

/// Media type of every problem body.
pub const PROBLEM_JSON: &str = "application/problem+json";

/// Schema of a problem body as rendered to clients (RFC 7807).
#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(example = json!({
    "title": "Delete Failed",
    "detail": "Failed to delete file 0b6f..._report.pdf: blob does not exist.",
    "status": 400
}))]
pub struct ProblemDetails {
    /// A short, human-readable summary of the problem type
    #[schema(example = "Delete Failed")]
    pub title: String,
    /// A human-readable explanation specific to this occurrence of the problem
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// HTTP status code mirrored into the body
    #[schema(example = 400)]
    pub status: u16,
}

/// A problem to return to the client.
#[derive(Debug, Clone)]
pub struct Problem {
    /// The status code of the problem.
    pub status_code: StatusCode,
    /// The actual body of the problem.
    pub body: BTreeMap<String, Value>,
}

/// Create a new `Problem` response to send to the client.
pub fn new<S>(status_code: S) -> Problem
where
    S: Into<StatusCode>,
{
    let status_code = status_code.into();
    let mut body = BTreeMap::new();
    body.insert("status".to_owned(), Value::from(status_code.as_u16()));
    Problem { status_code, body }
}

/// Shorthand for the 400 problem every failed blob operation turns into.
pub fn bad_request<T, D>(title: T, detail: D) -> Problem
where
    T: Into<String>,
    D: Into<String>,
{
    new(StatusCode::BAD_REQUEST)
        .with_title(title)
        .with_detail(detail)
}

impl Problem {
    /// Specify the "title" to use for the problem.
    pub fn with_title<S>(self, value: S) -> Self
    where
        S: Into<String>,
    {
        self.with_value("title", value.into())
    }

    /// Specify the "detail" to use for the problem.
    pub fn with_detail<S>(self, value: S) -> Self
    where
        S: Into<String>,
    {
        self.with_value("detail", value.into())
    }

    /// Specify an arbitrary value to include in the problem.
    pub fn with_value<V>(mut self, key: &str, value: V) -> Self
    where
        V: Into<Value>,
    {
        self.body.insert(key.to_owned(), value.into());
        self
    }

    /// The "title" member, if one was set.
    pub fn title(&self) -> Option<&str> {
        self.body.get("title").and_then(Value::as_str)
    }

    /// The "detail" member, if one was set.
    pub fn detail(&self) -> Option<&str> {
        self.body.get("detail").and_then(Value::as_str)
    }
}

impl<S> From<S> for Problem
where
    S: Into<StatusCode>,
{
    fn from(status_code: S) -> Self {
        new(status_code)
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> axum::response::Response {
        if self.status_code.is_server_error() {
            tracing::error!(status = %self.status_code, detail = ?self.detail(), "request failed");
        } else {
            tracing::debug!(
                status = %self.status_code,
                detail = ?self.detail(),
                "request rejected"
            );
        }

        let mut response = (self.status_code, Json(self.body)).into_response();
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(PROBLEM_JSON));
        response
    }
}
