use axum::extract::{Query, State};
use axum::Json;
use callboard_core::types::DbId;
use callboard_db::models::agent::AgentSummary;
use callboard_db::repositories::AgentRepo;
use serde::Deserialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for the agent list.
#[derive(Debug, Default, Deserialize)]
pub struct AgentListParams {
    /// Only agents with at least one call at this clinic.
    pub clinic_id: Option<DbId>,
}

/// GET /api/v1/agents?clinic_id=
///
/// Named agents sorted by trimmed name, for dashboard filters.
pub async fn list_agents(
    State(state): State<AppState>,
    Query(params): Query<AgentListParams>,
) -> AppResult<Json<DataResponse<Vec<AgentSummary>>>> {
    let agents = AgentRepo::list_named(&state.pool, params.clinic_id).await?;
    Ok(Json(DataResponse { data: agents }))
}
