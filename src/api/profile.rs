use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::api::ApiResult;
use crate::infrastructure::auth::Principal;
use crate::infrastructure::AppState;
use crate::services::account_service::{self, ProfileUpdate};

pub async fn get_profile(principal: Principal) -> impl IntoResponse {
    let complete = principal.user.profile_complete();
    Json(json!({
        "success": true,
        "user": principal.user,
        "profile_complete": complete,
    }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<ProfileUpdate>,
) -> ApiResult<impl IntoResponse> {
    let user =
        account_service::update_profile(state.db(), state.media.as_ref(), principal.user, payload)
            .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Profile updated successfully.",
        "user": user,
    })))
}
