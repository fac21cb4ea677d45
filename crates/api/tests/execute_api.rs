//! Integration tests for `POST /api/execute`.
//!
//! The test app points the sandbox at a runtime binary that does not exist,
//! so these cover everything up to (and the failure of) the first runtime
//! command without needing a container daemon.

mod common;

use axum::http::StatusCode;
use common::{body_json, is_empty_dir, post_json, post_raw, MISSING_RUNTIME};
use serde_json::json;

// ---------------------------------------------------------------------------
// Validation: rejected before any resource is acquired
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_script_returns_400_with_field_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path());

    let response = post_json(
        app,
        "/api/execute",
        json!({ "script": "   ", "language": "javascript" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["errors"]["script"][0], "script must not be empty");
    assert!(json["errors"].get("language").is_none());
    assert!(is_empty_dir(dir.path()));
}

#[tokio::test]
async fn unsupported_language_is_named_in_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path());

    let response = post_json(
        app,
        "/api/execute",
        json!({ "script": "print('hi')", "language": "python" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    let message = json["errors"]["language"][0].as_str().unwrap();
    assert!(message.contains("python"), "got: {message}");
}

#[tokio::test]
async fn missing_fields_are_all_reported() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path());

    let response = post_json(app, "/api/execute", json!({})).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["errors"]["script"].is_array());
    assert!(json["errors"]["language"].is_array());
}

#[tokio::test]
async fn oversized_script_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path());

    let response = post_json(
        app,
        "/api/execute",
        json!({ "script": "x".repeat(2048), "language": "typescript" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["errors"]["script"][0], "script exceeds 1024 bytes");
}

// ---------------------------------------------------------------------------
// Malformed bodies
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_json_returns_400() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path());

    let response = post_raw(app, "/api/execute", "{\"script\": ".to_string()).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn wrong_field_type_returns_400() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path());

    let response = post_json(
        app,
        "/api/execute",
        json!({ "script": 42, "language": "javascript" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

// ---------------------------------------------------------------------------
// Infra failure: generic 500, no internal detail, nothing left behind
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unavailable_runtime_returns_generic_500() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path());

    let response = post_json(
        app,
        "/api/execute",
        json!({ "script": "console.log(1)", "language": "javascript" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["message"], "Script execution failed");
    assert!(!json.to_string().contains(MISSING_RUNTIME));
    assert!(is_empty_dir(dir.path()));
}
