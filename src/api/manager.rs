use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::ApiResult;
use crate::infrastructure::auth::Principal;
use crate::infrastructure::AppState;
use crate::services::account_service::{self, SellerDecision, SellerStatusFilter};

#[derive(Debug, Deserialize)]
pub struct SellersQuery {
    pub status: Option<SellerStatusFilter>,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub action: SellerDecision,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToggleRequest {
    pub reason: Option<String>,
}

pub async fn dashboard(
    State(state): State<AppState>,
    principal: Principal,
) -> ApiResult<impl IntoResponse> {
    let dashboard = account_service::manager_dashboard(state.db(), &principal.user).await?;
    Ok(Json(json!({ "success": true, "dashboard": dashboard })))
}

pub async fn pending_sellers(
    State(state): State<AppState>,
    principal: Principal,
) -> ApiResult<impl IntoResponse> {
    let sellers = account_service::pending_sellers(state.db(), &principal.user).await?;
    Ok(Json(json!({
        "success": true,
        "count": sellers.len(),
        "sellers": sellers,
    })))
}

/// GET /api/manager/sellers?status=active|suspended
pub async fn manage_sellers(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<SellersQuery>,
) -> ApiResult<impl IntoResponse> {
    let sellers = account_service::manage_sellers(state.db(), &principal.user, params.status).await?;
    Ok(Json(json!({
        "success": true,
        "count": sellers.len(),
        "sellers": sellers,
    })))
}

pub async fn approve_seller(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
    Json(payload): Json<ApproveRequest>,
) -> ApiResult<impl IntoResponse> {
    let seller = account_service::approve_seller(
        state.db(),
        &principal.user,
        id,
        payload.action,
        payload.reason,
    )
    .await?;

    let message = match payload.action {
        SellerDecision::Approve => format!("Seller {} has been approved.", seller.username),
        SellerDecision::Reject => format!("Seller {} has been rejected.", seller.username),
    };
    Ok(Json(json!({ "success": true, "message": message, "seller": seller })))
}

pub async fn toggle_seller_status(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
    payload: Option<Json<ToggleRequest>>,
) -> ApiResult<impl IntoResponse> {
    let reason = payload.and_then(|Json(p)| p.reason);
    let seller =
        account_service::toggle_seller_status(state.db(), &principal.user, id, reason).await?;

    let message = if seller.is_suspended {
        format!("Seller {} has been suspended.", seller.username)
    } else {
        format!("Seller {} has been activated.", seller.username)
    };
    Ok(Json(json!({ "success": true, "message": message, "seller": seller })))
}
