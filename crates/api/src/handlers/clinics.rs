use axum::extract::State;
use axum::Json;
use callboard_db::models::clinic::ClinicWithCompany;
use callboard_db::repositories::ClinicRepo;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/clinics
pub async fn list_clinics(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<ClinicWithCompany>>>> {
    let clinics = ClinicRepo::list_with_company(&state.pool).await?;
    Ok(Json(DataResponse { data: clinics }))
}
