use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::api::ApiResult;
use crate::infrastructure::auth::Principal;
use crate::infrastructure::AppState;
use crate::services::agreement_service::{self, BuyPhoneInput, SellPhoneInput};
use crate::services::inventory_service::{self, PhoneFilter, PhoneUpdate};

/// GET /api/phones - Inventory, 12 per page
#[utoipa::path(
    get,
    path = "/api/phones",
    responses(
        (status = 200, description = "One page of phones visible to the caller"),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn list_phones(
    State(state): State<AppState>,
    principal: Principal,
    Query(filter): Query<PhoneFilter>,
) -> ApiResult<impl IntoResponse> {
    let page = inventory_service::list_phones(state.db(), &principal.user, filter).await?;
    Ok(Json(json!({ "success": true, "phones": page })))
}

pub async fn get_phone(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let detail = inventory_service::phone_detail(state.db(), id).await?;
    Ok(Json(json!({ "success": true, "phone": detail })))
}

pub async fn update_phone(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
    Json(payload): Json<PhoneUpdate>,
) -> ApiResult<impl IntoResponse> {
    let phone = inventory_service::update_phone(state.db(), &principal.user, id, payload).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Phone updated successfully.",
        "phone": phone,
    })))
}

/// POST /api/phones/buy - Buy a phone from a supplier into inventory
pub async fn buy_phone(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<BuyPhoneInput>,
) -> ApiResult<impl IntoResponse> {
    let detail =
        agreement_service::buy_phone(state.db(), state.media.as_ref(), &principal.user, payload)
            .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": format!("Phone purchased. Agreement {} created.", detail.reference),
            "agreement": detail,
        })),
    ))
}

/// POST /api/phones/:id/sell - Sell an available phone to a customer
pub async fn sell_phone(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
    Json(payload): Json<SellPhoneInput>,
) -> ApiResult<impl IntoResponse> {
    let detail = agreement_service::sell_phone(
        state.db(),
        state.media.as_ref(),
        state.config.commission_rate,
        &principal.user,
        id,
        payload,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": format!("Phone sold. Agreement {} created.", detail.reference),
            "agreement": detail,
        })),
    ))
}
