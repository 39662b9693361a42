pub mod admin;
pub mod agreements;
pub mod assignments;
pub mod auth;
pub mod customers;
pub mod gate;
pub mod health;
pub mod manager;
pub mod phones;
pub mod profile;
pub mod sales;
pub mod targets;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;

use crate::infrastructure::AppState;
use crate::services::account_service::HOME_ROUTE;
use crate::services::ServiceError;

/// Error returned by handlers. Renders the `{"success": false, "error": ..}`
/// body used across the API.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            ServiceError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "success": false, "error": format!("{} not found", what) })),
            )
                .into_response(),
            ServiceError::Validation(msg) | ServiceError::InvalidState(msg) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "error": msg })),
            )
                .into_response(),
            ServiceError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "success": false, "error": msg })),
            )
                .into_response(),
            ServiceError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                Json(json!({ "success": false, "error": msg, "redirect": HOME_ROUTE })),
            )
                .into_response(),
            e @ (ServiceError::Database(_) | ServiceError::Storage(_)) => {
                tracing::error!("Request failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "success": false, "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

pub fn api_router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Accounts
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/logout", post(auth::logout))
        .route("/hold", get(auth::hold))
        .route("/home", get(auth::home))
        .route("/profile", get(profile::get_profile).put(profile::update_profile))
        // Management
        .route("/manager/dashboard", get(manager::dashboard))
        .route("/manager/sellers", get(manager::manage_sellers))
        .route("/manager/sellers/pending", get(manager::pending_sellers))
        .route("/manager/sellers/:id/approve", post(manager::approve_seller))
        .route("/manager/sellers/:id/toggle", post(manager::toggle_seller_status))
        .route("/admin", get(admin::landing))
        .route("/admin/managers", post(admin::create_manager))
        // Inventory
        .route("/phones", get(phones::list_phones))
        .route("/phones/buy", post(phones::buy_phone))
        .route("/phones/:id", get(phones::get_phone).put(phones::update_phone))
        .route("/phones/:id/sell", post(phones::sell_phone))
        .route(
            "/phones/:id/assign",
            get(assignments::assignable_sellers).post(assignments::assign_phone),
        )
        // Agreements
        .route("/agreements", get(agreements::list_agreements))
        .route("/agreements/:id", get(agreements::get_agreement))
        .route("/agreements/:id/pdf", get(agreements::download_pdf))
        // Assignments
        .route("/assignments", get(assignments::list_assignments))
        .route("/assignments/:id/approve", post(assignments::approve_assignment))
        .route("/assignments/:id/reject", post(assignments::reject_assignment))
        // Sales
        .route("/sales/dashboard", get(sales::dashboard))
        .route("/sales/transactions", get(sales::list_transactions))
        .route("/sales/reports", get(sales::report))
        .route("/sales/reports/export", get(sales::export_report))
        .route("/sales/performance", post(sales::recalculate_performance))
        .route("/targets", get(targets::list_targets).post(targets::create_target))
        .route("/targets/:id/refresh", post(targets::refresh_progress))
        .route("/targets/:id/active", put(targets::set_active))
        .route("/customers", get(customers::list_customers))
        .route("/customers/refresh", post(customers::refresh_metrics))
}
