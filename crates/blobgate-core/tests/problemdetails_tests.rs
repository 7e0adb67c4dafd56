use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use blobgate_core::problemdetails::{self, PROBLEM_JSON};

#[test]
fn test_new_problem_carries_status_in_body() {
    let problem = problemdetails::new(StatusCode::NOT_FOUND);

    assert_eq!(problem.status_code, StatusCode::NOT_FOUND);
    assert_eq!(problem.body.get("status"), Some(&serde_json::json!(404)));
    assert!(problem.title().is_none());
    assert!(problem.detail().is_none());
}

#[test]
fn test_bad_request_helper() {
    let problem = problemdetails::bad_request("Upload Failed", "Failed to upload file a.txt: boom.");

    assert_eq!(problem.status_code, StatusCode::BAD_REQUEST);
    assert_eq!(problem.title(), Some("Upload Failed"));
    assert_eq!(problem.detail(), Some("Failed to upload file a.txt: boom."));
}

#[test]
fn test_with_value_overrides_existing_key() {
    let problem = problemdetails::new(StatusCode::BAD_REQUEST)
        .with_title("first")
        .with_title("second")
        .with_value("container", "uploads");

    assert_eq!(problem.title(), Some("second"));
    assert_eq!(problem.body.get("container"), Some(&serde_json::json!("uploads")));
}

#[tokio::test]
async fn test_into_response_uses_problem_json() {
    let response = problemdetails::bad_request("List Failed", "Failed to list files: nope.")
        .into_response();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).unwrap(),
        PROBLEM_JSON
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["title"], "List Failed");
    assert_eq!(json["detail"], "Failed to list files: nope.");
    assert_eq!(json["status"], 400);
}

#[test]
fn test_problem_from_status_code() {
    let problem: problemdetails::Problem = StatusCode::PAYLOAD_TOO_LARGE.into();
    assert_eq!(problem.status_code, StatusCode::PAYLOAD_TOO_LARGE);
}
