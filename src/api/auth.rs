use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::ApiResult;
use crate::infrastructure::auth::{bearer_token, decode_jwt, Principal};
use crate::infrastructure::AppState;
use crate::services::account_service::{self, RegisterInput, HOME_ROUTE, LOGIN_ROUTE};

#[derive(Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    responses(
        (status = 200, description = "Token issued with the caller's landing route"),
        (status = 401, description = "Invalid username or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    tracing::info!("Login attempt for user: {}", payload.username);

    let outcome = account_service::login(state.db(), &payload.username, &payload.password).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "token": outcome.token,
            "redirect": outcome.redirect,
            "user": outcome.user,
        })),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    responses(
        (status = 201, description = "Seller registered, pending approval"),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterInput>,
) -> ApiResult<impl IntoResponse> {
    let user = account_service::register(state.db(), payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Registration successful! Your account is pending approval by a manager.",
            "user": user,
            "redirect": LOGIN_ROUTE,
        })),
    ))
}

/// Revokes the presented token, if any. Always points back at the login route.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = bearer_token(&headers) {
        if let Ok(claims) = decode_jwt(token) {
            state.revoked.revoke(token, claims.exp);
            tracing::info!("User {} logged out", claims.sub);
        }
    }

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "You have been logged out.",
            "redirect": LOGIN_ROUTE,
        })),
    )
}

pub async fn hold(principal: Principal) -> impl IntoResponse {
    match account_service::hold_info(&principal.user) {
        Some(info) => (
            StatusCode::OK,
            Json(json!({ "success": true, "hold": info })),
        ),
        None => (
            StatusCode::OK,
            Json(json!({ "success": true, "redirect": HOME_ROUTE })),
        ),
    }
}

pub async fn home(principal: Principal) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "redirect": account_service::home_route(&principal.user),
    }))
}
