use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::ApiResult;
use crate::infrastructure::auth::Principal;
use crate::infrastructure::AppState;
use crate::services::target_service::{self, CreateTargetInput, TargetFilter};

#[derive(Debug, Deserialize)]
pub struct ActiveRequest {
    pub is_active: bool,
}

pub async fn list_targets(
    State(state): State<AppState>,
    principal: Principal,
    Query(filter): Query<TargetFilter>,
) -> ApiResult<impl IntoResponse> {
    let targets = target_service::list_targets(state.db(), &principal.user, filter).await?;
    Ok(Json(json!({
        "success": true,
        "count": targets.len(),
        "targets": targets,
    })))
}

pub async fn create_target(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<CreateTargetInput>,
) -> ApiResult<impl IntoResponse> {
    let target = target_service::create_target(state.db(), &principal.user, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "target": target })),
    ))
}

pub async fn refresh_progress(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let target = target_service::refresh_target_progress(state.db(), &principal.user, id).await?;
    Ok(Json(json!({ "success": true, "target": target })))
}

pub async fn set_active(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
    Json(payload): Json<ActiveRequest>,
) -> ApiResult<impl IntoResponse> {
    let target =
        target_service::set_target_active(state.db(), &principal.user, id, payload.is_active)
            .await?;
    Ok(Json(json!({ "success": true, "target": target })))
}
