use axum::routing::post;
use axum::Router;

use crate::handlers::execute;
use crate::state::AppState;

/// Routes mounted under `/api`.
///
/// ```text
/// POST   /execute   -> execute_script
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/execute", post(execute::execute_script))
}
