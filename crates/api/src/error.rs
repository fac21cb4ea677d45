use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Map, Value};
use scriptbox_core::error::CoreError;
use validator::ValidationErrors;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
///
/// Script errors and timeouts never reach this type; they are `200` results.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `scriptbox_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A request body that could not be decoded.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Core(CoreError::Validation(errors)) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "message": "Validation failed",
                    "code": "VALIDATION_ERROR",
                    "errors": field_messages(errors),
                }),
            ),
            // Sandbox detail (commands, paths, runtime output) is logged, never returned.
            AppError::Core(CoreError::Sandbox(err)) => {
                tracing::error!(error = %err, "Sandbox failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "message": "Script execution failed",
                        "code": "INTERNAL_ERROR",
                    }),
                )
            }
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "message": msg, "code": "BAD_REQUEST" }),
            ),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Flatten validator errors into `{ field: [message, ...] }`.
///
/// Falls back to the error code when a rule carries no message.
fn field_messages(errors: &ValidationErrors) -> Map<String, Value> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages: Vec<String> = errs
                .iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => e.code.to_string(),
                })
                .collect();
            (field.to_string(), json!(messages))
        })
        .collect()
}
