use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::ApiResult;
use crate::infrastructure::auth::Principal;
use crate::infrastructure::AppState;
use crate::services::sales_service::{
    self, DashboardQuery, PerformanceInput, ReportQuery, ReportType, TransactionFilter,
};
use crate::services::ServiceError;

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
    #[serde(default)]
    pub report_type: ReportType,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// GET /api/sales/dashboard?period=monthly&page=2
pub async fn dashboard(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<impl IntoResponse> {
    let dashboard = sales_service::sales_dashboard(state.db(), &principal.user, query).await?;
    Ok(Json(json!({ "success": true, "dashboard": dashboard })))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    principal: Principal,
    Query(filter): Query<TransactionFilter>,
) -> ApiResult<impl IntoResponse> {
    let page = sales_service::list_transactions(state.db(), &principal.user, filter).await?;
    Ok(Json(json!({ "success": true, "transactions": page })))
}

pub async fn report(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<ReportQuery>,
) -> ApiResult<impl IntoResponse> {
    let report = sales_service::sales_report(state.db(), &principal.user, query).await?;
    Ok(Json(json!({ "success": true, "report": report })))
}

/// GET /api/sales/reports/export?format=csv
#[utoipa::path(
    get,
    path = "/api/sales/reports/export",
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv"),
        (status = 400, description = "Unsupported format or bad date range")
    )
)]
pub async fn export_report(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<ExportQuery>,
) -> ApiResult<impl IntoResponse> {
    let format = params.format.unwrap_or_else(|| "csv".to_string());
    let query = ReportQuery {
        report_type: params.report_type,
        start_date: params.start_date,
        end_date: params.end_date,
    };
    let (filename, bytes) =
        sales_service::export_report(state.db(), &principal.user, query, &format).await?;

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(|e| ServiceError::Storage(e.to_string()))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/csv"));
    headers.insert(header::CONTENT_DISPOSITION, disposition);

    Ok((StatusCode::OK, headers, bytes))
}

pub async fn recalculate_performance(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<PerformanceInput>,
) -> ApiResult<impl IntoResponse> {
    let performance =
        sales_service::recalculate_performance(state.db(), &principal.user, payload).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Performance recalculated.",
        "performance": performance,
    })))
}
