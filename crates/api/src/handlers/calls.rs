//! Handlers for individual calls and the QA review queue.

use axum::extract::{Path, Query, State};
use axum::Json;
use callboard_core::error::CoreError;
use callboard_core::types::DbId;
use callboard_db::models::call::{Call, CallDetail, ReviewQueueFilter, UpdateCallReview};
use callboard_db::repositories::CallRepo;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/calls/{id}
pub async fn get_call(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<CallDetail>>> {
    let call = CallRepo::find_detail_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound { entity: "Call", id })?;
    Ok(Json(DataResponse { data: call }))
}

/// PATCH /api/v1/calls/{id}
///
/// Record the engineer's QA status and comments.
pub async fn update_review(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateCallReview>,
) -> AppResult<Json<DataResponse<Call>>> {
    let call = CallRepo::update_review(&state.pool, id, &input)
        .await?
        .ok_or(CoreError::NotFound { entity: "Call", id })?;
    tracing::info!(call_id = id, status = ?call.engineer_status, "Call review updated");
    Ok(Json(DataResponse { data: call }))
}

/// GET /api/v1/calls/qa-review?clinic_id=&agent_id=
///
/// Calls awaiting an engineer review, oldest first.
pub async fn review_queue(
    State(state): State<AppState>,
    Query(filter): Query<ReviewQueueFilter>,
) -> AppResult<Json<DataResponse<Vec<CallDetail>>>> {
    let calls = CallRepo::list_awaiting_review(&state.pool, &filter).await?;
    Ok(Json(DataResponse { data: calls }))
}
