mod common;

use axum::http::{header, Method, StatusCode};
use common::*;
use phonedesk::models::user;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::json;

fn registration(username: &str) -> serde_json::Value {
    json!({
        "username": username,
        "email": format!("{}@example.com", username),
        "first_name": "Diane",
        "last_name": "Ingabire",
        "phone_number": "+250788777666",
        "password1": "correct-horse",
        "password2": "correct-horse",
    })
}

async fn login(app: &TestApp, username: &str, password: &str) -> (StatusCode, serde_json::Value) {
    send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await
}

#[tokio::test]
async fn test_registration_starts_pending_approval() {
    let app = setup_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(registration("diane")),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["redirect"], "/api/auth/login");
    assert_eq!(body["user"]["is_suspended"], true);
    assert_eq!(body["user"]["role"], "seller");
    assert_eq!(
        body["user"]["suspended_reason"],
        "New account pending manager approval"
    );
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_registration_validation_messages() {
    let app = setup_app().await;

    let mut mismatch = registration("eve");
    mismatch["password2"] = json!("something-else");
    let (status, body) = send(&app, Method::POST, "/api/auth/register", None, Some(mismatch)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Passwords do not match.");

    let mut bad_phone = registration("eve");
    bad_phone["phone_number"] = json!("0788777666");
    let (status, body) = send(&app, Method::POST, "/api/auth/register", None, Some(bad_phone)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Phone number must be in format +250XXXXXXXXX");

    send(&app, Method::POST, "/api/auth/register", None, Some(registration("eve"))).await;
    let (status, body) =
        send(&app, Method::POST, "/api/auth/register", None, Some(registration("eve"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username already exists.");
}

#[tokio::test]
async fn test_pending_seller_is_held_until_approved() {
    let app = setup_app().await;
    let boss = manager(&app, "boss").await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(registration("diane")),
    )
    .await;
    let seller_id = body["user"]["id"].as_i64().unwrap();

    // Login works but lands on the hold page
    let (status, body) = login(&app, "diane", "correct-horse").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["redirect"], "/api/hold");
    let token = body["token"].as_str().unwrap().to_string();

    // Everything else redirects to the hold page
    let raw = send_raw(&app, Method::GET, "/api/phones", Some(&token), None).await;
    assert_eq!(raw.status, StatusCode::SEE_OTHER);
    assert_eq!(raw.headers.get(header::LOCATION).unwrap(), "/api/hold");

    let (status, body) = send(&app, Method::GET, "/api/hold", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hold"]["pending_approval"], true);

    // Manager approves
    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/manager/sellers/{}/approve", seller_id),
        Some(&boss.token),
        Some(json!({ "action": "approve" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["seller"]["is_suspended"], false);

    let (status, body) = login(&app, "diane", "correct-horse").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["redirect"], "/api/phones");

    let (status, body) = send(&app, Method::GET, "/api/hold", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["redirect"], "/api/home");
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let app = setup_app().await;
    seller(&app, "alice").await;

    let (status, body) = login(&app, "alice", "nope").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid username or password.");

    let (status, _) = login(&app, "nobody", "password123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_redirects_by_role() {
    let app = setup_app().await;
    seller(&app, "alice").await;
    manager(&app, "boss").await;
    create_account(&app, "root", None, true, false).await;

    let (_, body) = login(&app, "alice", "password123").await;
    assert_eq!(body["redirect"], "/api/phones");
    let (_, body) = login(&app, "boss", "password123").await;
    assert_eq!(body["redirect"], "/api/manager/dashboard");
    let (_, body) = login(&app, "root", "password123").await;
    assert_eq!(body["redirect"], "/api/admin");
}

#[tokio::test]
async fn test_suspended_superuser_is_not_held() {
    let app = setup_app().await;
    let root = create_account(&app, "root", None, true, true).await;

    let (status, _) = send(&app, Method::GET, "/api/admin", Some(&root.token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let app = setup_app().await;
    let alice = seller(&app, "alice").await;

    let (status, _) = send(&app, Method::GET, "/api/profile", Some(&alice.token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::POST, "/api/auth/logout", Some(&alice.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["redirect"], "/api/auth/login");

    let (status, _) = send(&app, Method::GET, "/api/profile", Some(&alice.token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_held_account_can_log_out() {
    let app = setup_app().await;
    let held = create_account(&app, "held", Some("seller"), false, true).await;

    let (status, _) = send(&app, Method::POST, "/api/auth/logout", Some(&held.token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_seller_cannot_open_manager_pages() {
    let app = setup_app().await;
    let alice = seller(&app, "alice").await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/manager/dashboard",
        Some(&alice.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Access denied. Manager privileges required.");
    assert_eq!(body["redirect"], "/api/home");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = setup_app().await;
    let (status, _) = send(&app, Method::GET, "/api/phones", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_toggle_suspends_then_activates_seller() {
    let app = setup_app().await;
    let boss = manager(&app, "boss").await;
    let alice = seller(&app, "alice").await;
    let uri = format!("/api/manager/sellers/{}/toggle", alice.user.id);

    let (status, body) = send(
        &app,
        Method::POST,
        &uri,
        Some(&boss.token),
        Some(json!({ "reason": "Missing stock count" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["seller"]["is_suspended"], true);
    assert_eq!(body["seller"]["suspended_reason"], "Missing stock count");

    let (_, body) = send(
        &app,
        Method::GET,
        "/api/manager/sellers?status=suspended",
        Some(&boss.token),
        None,
    )
    .await;
    assert_eq!(body["count"], 1);

    let (_, body) = send(&app, Method::POST, &uri, Some(&boss.token), None).await;
    assert_eq!(body["seller"]["is_suspended"], false);
    assert_eq!(body["seller"]["suspended_reason"], "");
}

#[tokio::test]
async fn test_manager_rejection_keeps_account_suspended() {
    let app = setup_app().await;
    let boss = manager(&app, "boss").await;
    let pending = create_account(&app, "pending", Some("seller"), false, true).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/manager/sellers/{}/approve", pending.user.id),
        Some(&boss.token),
        Some(json!({ "action": "reject" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["seller"]["is_suspended"], true);
    assert_eq!(body["seller"]["suspended_reason"], "Account rejected by manager");
    assert_eq!(body["seller"]["suspended_by"], boss.user.id);
}

#[tokio::test]
async fn test_superuser_creates_manager() {
    let app = setup_app().await;
    let root = create_account(&app, "root", None, true, false).await;
    let boss = manager(&app, "boss").await;

    let payload = json!({ "username": "grace", "password": "s3cret!" });
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/admin/managers",
        Some(&boss.token),
        Some(payload.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/admin/managers",
        Some(&root.token),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["manager"]["role"], "manager");

    let (_, body) = send(&app, Method::GET, "/api/admin", Some(&root.token), None).await;
    let names: Vec<&str> = body["managers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["boss", "grace"]);
}

#[tokio::test]
async fn test_profile_update_stores_signature() {
    let app = setup_app().await;
    let alice = seller(&app, "alice").await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/profile",
        Some(&alice.token),
        Some(json!({
            "first_name": "Alice",
            "last_name": "Uwase",
            "email": "alice@shop.rw",
            "phone_number": "+250788200200",
            "address": "Nyamirambo",
            "national_id": "1199570012345672",
            "signature": png_data_url(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (_, body) = send(&app, Method::GET, "/api/profile", Some(&alice.token), None).await;
    let body = body.to_string();
    assert!(body.contains("signatures/"));
    assert!(body.contains("Nyamirambo"));
}

fn bare_account(username: &str, email: &str) -> user::ActiveModel {
    user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(email.to_string()),
        password_hash: Set("x".to_string()),
        role: Set(Some("seller".to_string())),
        is_superuser: Set(false),
        first_name: Set(String::new()),
        last_name: Set(String::new()),
        phone_number: Set(String::new()),
        address: Set(String::new()),
        national_id: Set(String::new()),
        signature: Set(None),
        is_suspended: Set(false),
        suspended_at: Set(None),
        suspended_reason: Set(String::new()),
        suspended_by: Set(None),
        date_joined: Set("2024-01-01 08:00:00".to_string()),
        updated_at: Set("2024-01-01 08:00:00".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_database_refuses_shared_email() {
    let app = setup_app().await;
    seller(&app, "alice").await;

    let duplicate = bare_account("alice2", "alice@example.com")
        .insert(app.state.db())
        .await;
    assert!(duplicate.is_err());

    // Accounts without an email do not collide
    bare_account("walkin1", "").insert(app.state.db()).await.unwrap();
    bare_account("walkin2", "").insert(app.state.db()).await.unwrap();
}
