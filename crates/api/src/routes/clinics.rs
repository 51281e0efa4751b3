use axum::routing::get;
use axum::Router;

use crate::handlers::clinics;
use crate::state::AppState;

/// Clinic routes mounted at `/clinics`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(clinics::list_clinics))
}
