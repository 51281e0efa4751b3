pub mod agents;
pub mod calls;
pub mod clinics;
pub mod health;
pub mod import;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /calls/import                 upload (POST), status (GET)
/// /calls/import/stream          progress stream (SSE)
/// /calls/qa-review              calls awaiting review
/// /calls/{id}                   get, record review (PATCH)
///
/// /clinics                      list
/// /agents                       list (optional ?clinic_id=)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/calls/import", import::router())
        .nest("/calls", calls::router())
        .nest("/clinics", clinics::router())
        .nest("/agents", agents::router())
}
