//! Handler for script execution.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use scriptbox_core::sandbox::submission::SubmissionRequest;
use scriptbox_core::sandbox::ExecutionResult;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /api/execute
///
/// Runs the submitted script in a fresh container. Script errors and
/// timeouts are ordinary `200` responses; validation failures are `400` and
/// sandbox failures `500` (see [`AppError`]).
///
/// The execution runs detached from the request so that container teardown
/// completes even if the client disconnects or the request times out.
pub async fn execute_script(
    State(state): State<AppState>,
    payload: Result<Json<SubmissionRequest>, JsonRejection>,
) -> AppResult<Json<ExecutionResult>> {
    let Json(request) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let result = state.orchestrator.execute_detached(request).await?;
    Ok(Json(result))
}
