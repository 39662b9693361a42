//! Superuser surface

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::api::ApiResult;
use crate::infrastructure::auth::Principal;
use crate::infrastructure::AppState;
use crate::services::account_service::{self, CreateManagerInput};

pub async fn landing(
    State(state): State<AppState>,
    principal: Principal,
) -> ApiResult<impl IntoResponse> {
    let managers = account_service::managers(state.db(), &principal.user).await?;
    Ok(Json(json!({
        "success": true,
        "user": principal.user,
        "managers": managers,
    })))
}

pub async fn create_manager(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<CreateManagerInput>,
) -> ApiResult<impl IntoResponse> {
    let manager = account_service::create_manager(state.db(), &principal.user, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": format!("Manager account {} created.", manager.username),
            "manager": manager,
        })),
    ))
}
