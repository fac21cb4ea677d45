#![allow(dead_code)]

use std::path::Path;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use scriptbox_api::config::ServerConfig;
use scriptbox_api::router::build_app_router;
use scriptbox_api::state::AppState;
use scriptbox_core::sandbox::SandboxConfig;
use tower::ServiceExt;

/// A container runtime binary that does not exist, so any request that gets
/// past validation fails as an infrastructure error without touching docker.
pub const MISSING_RUNTIME: &str = "scriptbox-test-missing-runtime";

/// Build a test `ServerConfig` whose sandbox writes into `work_dir`.
pub fn test_config(work_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        sandbox: SandboxConfig {
            runtime: MISSING_RUNTIME.to_string(),
            max_script_bytes: 1024,
            ..SandboxConfig::with_work_dir(work_dir)
        },
    }
}

/// Build the full application router with all middleware layers.
pub fn build_test_app(work_dir: &Path) -> Router {
    let config = test_config(work_dir);
    build_app_router(AppState::new(config.clone()), &config)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    post_raw(app, uri, body.to_string()).await
}

pub async fn post_raw(app: Router, uri: &str, body: String) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn is_empty_dir(path: &Path) -> bool {
    std::fs::read_dir(path).unwrap().next().is_none()
}
