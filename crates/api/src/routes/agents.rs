use axum::routing::get;
use axum::Router;

use crate::handlers::agents;
use crate::state::AppState;

/// Agent routes mounted at `/agents`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(agents::list_agents))
}
