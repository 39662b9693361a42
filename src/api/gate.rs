//! Suspension gate
//!
//! Suspended regular accounts may only look at their hold page or log out.
//! Anything else they request is redirected to the hold page. Requests without
//! a usable token pass through; handlers decide whether they need a caller.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::infrastructure::auth::{authenticate, bearer_token, AuthFailure, Principal};
use crate::infrastructure::AppState;
use crate::models::user;
use crate::services::account_service::HOLD_ROUTE;

/// Paths a suspended account may still reach.
pub const HOLD_ALLOW_LIST: &[&str] = &[HOLD_ROUTE, "/api/auth/logout"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Pass,
    Hold,
}

pub fn gate_decision(path: &str, caller: Option<&user::Model>) -> GateDecision {
    let path = path.trim_end_matches('/');
    match caller {
        Some(user) if user.is_held() && !HOLD_ALLOW_LIST.contains(&path) => GateDecision::Hold,
        _ => GateDecision::Pass,
    }
}

async fn caller(state: &AppState, headers: &HeaderMap) -> Option<user::Model> {
    let token = bearer_token(headers)?;
    match authenticate(state.db(), &state.revoked, token).await {
        Ok((user, _)) => Some(user),
        Err(AuthFailure::Database(e)) => {
            tracing::error!("Suspension gate could not load caller: {}", e);
            None
        }
        Err(_) => None,
    }
}

pub async fn suspension_gate(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    let caller = caller(&state, request.headers()).await;

    match gate_decision(&path, caller.as_ref()) {
        GateDecision::Pass => next.run(request).await,
        GateDecision::Hold => {
            if let Some(user) = caller {
                tracing::debug!("Holding suspended user {} at {}", user.username, path);
            }
            Redirect::to(HOLD_ROUTE).into_response()
        }
    }
}

/// Captured media (ID photos, signatures) is only served to signed-in users.
/// The `Principal` extractor answers 401 before the file is touched.
pub async fn require_principal(
    _principal: Principal,
    request: Request<Body>,
    next: Next,
) -> Response {
    next.run(request).await
}
