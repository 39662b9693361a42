use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::api::ApiResult;
use crate::infrastructure::auth::Principal;
use crate::infrastructure::AppState;
use crate::services::agreement_service::{self, AgreementFilter};
use crate::services::ServiceError;

pub async fn list_agreements(
    State(state): State<AppState>,
    principal: Principal,
    Query(filter): Query<AgreementFilter>,
) -> ApiResult<impl IntoResponse> {
    let page = agreement_service::list_agreements(state.db(), &principal.user, filter).await?;
    Ok(Json(json!({ "success": true, "agreements": page })))
}

pub async fn get_agreement(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let detail = agreement_service::agreement_detail(state.db(), &principal.user, id).await?;
    Ok(Json(json!({ "success": true, "agreement": detail })))
}

/// GET /api/agreements/:id/pdf - Printable agreement as an attachment
#[utoipa::path(
    get,
    path = "/api/agreements/{id}/pdf",
    params(("id" = i32, Path, description = "Agreement id")),
    responses(
        (status = 200, description = "PDF document", content_type = "application/pdf"),
        (status = 404, description = "Agreement not found or not visible to the caller")
    )
)]
pub async fn download_pdf(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let pdf =
        agreement_service::agreement_pdf(state.db(), state.media.as_ref(), &principal.user, id)
            .await?;

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", pdf.filename))
        .map_err(|e| ServiceError::Storage(e.to_string()))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    headers.insert(header::CONTENT_DISPOSITION, disposition);

    tracing::info!("{} downloaded {}", principal.user.username, pdf.filename);
    Ok((StatusCode::OK, headers, pdf.bytes))
}
