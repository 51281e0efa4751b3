//! Route definitions for spreadsheet imports, mounted at `/calls/import`.

use axum::routing::get;
use axum::Router;

use crate::handlers::import;
use crate::state::AppState;

/// ```text
/// POST   /          -> upload
/// GET    /          -> status
/// GET    /stream    -> stream
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(import::status).post(import::upload))
        .route("/stream", get(import::stream))
}
