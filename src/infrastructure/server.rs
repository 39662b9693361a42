// Server module - router assembly and the listening loop

use axum::{http::HeaderValue, middleware, routing::get, Json, Router};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::api;
use crate::api_docs::ApiDoc;
use crate::infrastructure::AppState;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let mut allowed = Vec::new();
    for origin in origins {
        match origin.parse::<HeaderValue>() {
            Ok(v) => allowed.push(v),
            Err(e) => tracing::error!("Failed to parse CORS origin '{}': {}", origin, e),
        }
    }
    layer.allow_origin(allowed)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the application router: API, media files for signed-in users, the
/// OpenAPI document, and the suspension gate in front of all of them.
pub fn build_router(state: AppState) -> Router {
    let media = Router::new()
        .fallback_service(ServeDir::new(&state.config.media_root))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::gate::require_principal,
        ));
    let cors = cors_layer(&state.config.cors_allowed_origins);

    Router::new()
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest("/api", api::api_router())
        .nest("/media", media)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::gate::suspension_gate,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve until the process is stopped.
pub async fn serve(state: AppState) -> Result<(), String> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    tracing::info!("Phonedesk server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| format!("HTTP server error: {}", e))
}
