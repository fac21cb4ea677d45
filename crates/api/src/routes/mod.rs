pub mod execute;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /execute                                         run a script (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(execute::router())
}
