use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::api::ApiResult;
use crate::infrastructure::auth::Principal;
use crate::infrastructure::AppState;
use crate::services::customer_service::{self, CustomerFilter};

pub async fn list_customers(
    State(state): State<AppState>,
    principal: Principal,
    Query(filter): Query<CustomerFilter>,
) -> ApiResult<impl IntoResponse> {
    let page = customer_service::list_customers(state.db(), &principal.user, filter).await?;
    Ok(Json(json!({ "success": true, "customers": page })))
}

pub async fn refresh_metrics(
    State(state): State<AppState>,
    principal: Principal,
) -> ApiResult<impl IntoResponse> {
    let count = customer_service::refresh_all_metrics(state.db(), &principal.user).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Refreshed metrics for {} customers.", count),
        "count": count,
    })))
}
