use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::api::ApiResult;
use crate::infrastructure::auth::Principal;
use crate::infrastructure::AppState;
use crate::services::assignment_service::{self, AssignInput};
use crate::services::inventory_service;
use crate::services::ServiceError;

/// GET /api/phones/:id/assign - The phone and the sellers it can go to
pub async fn assignable_sellers(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let detail = inventory_service::phone_detail(state.db(), id).await?;
    if detail.phone.phone.current_owner_id != principal.id() {
        return Err(ServiceError::NotFound("Phone").into());
    }
    let sellers = assignment_service::assignable_sellers(state.db(), &principal.user).await?;

    Ok(Json(json!({
        "success": true,
        "phone": detail.phone,
        "sellers": sellers,
    })))
}

pub async fn assign_phone(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
    Json(payload): Json<AssignInput>,
) -> ApiResult<impl IntoResponse> {
    let assignment =
        assignment_service::assign_phone(state.db(), &principal.user, id, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Assignment request sent.",
            "assignment": assignment,
        })),
    ))
}

pub async fn list_assignments(
    State(state): State<AppState>,
    principal: Principal,
) -> ApiResult<impl IntoResponse> {
    let lists = assignment_service::list_assignments(state.db(), &principal.user).await?;
    Ok(Json(json!({ "success": true, "assignments": lists })))
}

pub async fn approve_assignment(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let assignment =
        assignment_service::approve_assignment(state.db(), &principal.user, id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Assignment approved. The phone is now in your inventory.",
        "assignment": assignment,
    })))
}

pub async fn reject_assignment(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let assignment = assignment_service::reject_assignment(state.db(), &principal.user, id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Assignment rejected. The phone was returned to the sender.",
        "assignment": assignment,
    })))
}
