use axum::{extract::State, Json};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::align::Tolerances;
use crate::config::Permission;
use crate::session::AlignmentStatus;
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::auth::{require_permission, AppState, AuthenticatedUser};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ToleranceRequest {
    pub azimuth_tolerance_deg: f64,
}

#[utoipa::path(
    get,
    path = "/api/align/status",
    security(
        ("api_key" = [])
    ),
    responses(
        (status = 200, description = "Current alignment snapshot", body = AlignmentStatus),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "align"
)]
pub async fn status(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> ApiResult<Json<AlignmentStatus>> {
    let aligner = state.aligner.lock().await;
    Ok(Json(aligner.status()))
}

#[utoipa::path(
    put,
    path = "/api/align/tolerance",
    request_body = ToleranceRequest,
    security(
        ("api_key" = [])
    ),
    responses(
        (status = 200, description = "Updated tolerance windows", body = Tolerances),
        (status = 400, description = "Tolerance outside the control range", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "align"
)]
pub async fn set_tolerance(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<ToleranceRequest>,
) -> ApiResult<Json<Tolerances>> {
    require_permission(&user, Permission::AdjustTolerance)?;

    let aligner = state.aligner.lock().await;
    let updated = aligner
        .set_azimuth_tolerance(request.azimuth_tolerance_deg)
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    Ok(Json(updated))
}
