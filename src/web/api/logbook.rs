use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::Permission;
use crate::logbook::LogEntry;
use crate::web::api::error::{ApiResult, ErrorResponse};
use crate::web::auth::{require_permission, AppState, AuthenticatedUser};

#[derive(Debug, Serialize, ToSchema)]
pub struct ExportResponse {
    pub path: String,
    pub entries: usize,
}

#[utoipa::path(
    get,
    path = "/api/log",
    security(
        ("api_key" = [])
    ),
    responses(
        (status = 200, description = "Installer log entries", body = Vec<LogEntry>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "log"
)]
pub async fn list(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> ApiResult<Json<Vec<LogEntry>>> {
    let aligner = state.aligner.lock().await;
    let logbook = aligner.logbook();
    let entries = logbook.lock().unwrap().entries().to_vec();
    Ok(Json(entries))
}

#[utoipa::path(
    post,
    path = "/api/log/reset",
    security(
        ("api_key" = [])
    ),
    responses(
        (status = 204, description = "Installer log cleared"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Missing manage_log permission", body = ErrorResponse)
    ),
    tag = "log"
)]
pub async fn reset(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<StatusCode> {
    require_permission(&user, Permission::ManageLog)?;

    let aligner = state.aligner.lock().await;
    let logbook = aligner.logbook();
    logbook.lock().unwrap().reset();
    log::info!("installer log reset by {}", user.name);
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/log/export",
    security(
        ("api_key" = [])
    ),
    responses(
        (status = 200, description = "Log exported for hand-off", body = ExportResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Missing manage_log permission", body = ErrorResponse),
        (status = 500, description = "Export failed", body = ErrorResponse)
    ),
    tag = "log"
)]
pub async fn export(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<ExportResponse>> {
    require_permission(&user, Permission::ManageLog)?;

    let aligner = state.aligner.lock().await;
    let logbook = aligner.logbook();
    let (serialized, entries) = {
        let logbook = logbook.lock().unwrap();
        (logbook.export_serialized()?, logbook.len())
    };

    let path = state.exporter.export(&serialized)?;
    log::info!("installer log exported to {}", path.display());

    Ok(Json(ExportResponse {
        path: path.display().to_string(),
        entries,
    }))
}
