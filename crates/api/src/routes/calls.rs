use axum::routing::get;
use axum::Router;

use crate::handlers::calls;
use crate::state::AppState;

/// Call routes mounted at `/calls`.
///
/// ```text
/// GET    /qa-review   -> review_queue
/// GET    /{id}        -> get_call
/// PATCH  /{id}        -> update_review
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/qa-review", get(calls::review_queue))
        .route("/{id}", get(calls::get_call).patch(calls::update_review))
}
