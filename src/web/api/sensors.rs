use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::config::Permission;
use crate::position::Coordinates;
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::auth::{require_permission, AppState, AuthenticatedUser};

#[derive(Debug, Deserialize, ToSchema)]
pub struct HeadingUpdate {
    pub heading_deg: f64,
}

#[utoipa::path(
    post,
    path = "/api/sensors/heading",
    request_body = HeadingUpdate,
    security(
        ("api_key" = [])
    ),
    responses(
        (status = 204, description = "Heading accepted"),
        (status = 400, description = "Non-finite heading", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "sensors"
)]
pub async fn push_heading(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(update): Json<HeadingUpdate>,
) -> ApiResult<StatusCode> {
    require_permission(&user, Permission::PushSensors)?;

    if !update.heading_deg.is_finite() {
        return Err(ApiError::Validation("heading must be finite".into()));
    }

    let aligner = state.aligner.lock().await;
    aligner.push_heading(update.heading_deg);
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/sensors/position",
    request_body = Coordinates,
    security(
        ("api_key" = [])
    ),
    responses(
        (status = 204, description = "Position accepted"),
        (status = 400, description = "Invalid coordinates", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "sensors"
)]
pub async fn push_position(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(coordinates): Json<Coordinates>,
) -> ApiResult<StatusCode> {
    require_permission(&user, Permission::PushSensors)?;

    let valid = coordinates.latitude.is_finite()
        && coordinates.longitude.is_finite()
        && coordinates.latitude.abs() <= 90.0
        && coordinates.longitude.abs() <= 180.0;
    if !valid {
        return Err(ApiError::Validation("invalid coordinates".into()));
    }

    let aligner = state.aligner.lock().await;
    aligner.push_position(coordinates);
    Ok(StatusCode::NO_CONTENT)
}
