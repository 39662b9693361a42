#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use base64::Engine;
use phonedesk::auth::{create_jwt, role_claim};
use phonedesk::config::Config;
use phonedesk::db;
use phonedesk::infrastructure::AppState;
use phonedesk::models::user;
use phonedesk::server::build_router;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tower::util::ServiceExt; // for `oneshot`

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

// Helper to create an app over a fresh in-memory database
pub async fn setup_app() -> TestApp {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    let config = Config {
        media_root: std::env::temp_dir().join(format!("phonedesk-test-{}", uuid::Uuid::new_v4())),
        ..Default::default()
    };
    let state = AppState::new(db, config);
    TestApp {
        router: build_router(state.clone()),
        state,
    }
}

pub struct Account {
    pub user: user::Model,
    pub token: String,
}

pub fn token_for(user: &user::Model) -> String {
    create_jwt(user.id, &user.username, &role_claim(user)).expect("Failed to create token")
}

/// Insert an account with a complete profile.
pub async fn create_account(
    app: &TestApp,
    username: &str,
    role: Option<&str>,
    superuser: bool,
    suspended: bool,
) -> Account {
    let now = "2024-01-01 08:00:00".to_string();
    let user = user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(format!("{}@example.com", username)),
        password_hash: Set(phonedesk::auth::hash_password("password123").unwrap()),
        role: Set(role.map(str::to_string)),
        is_superuser: Set(superuser),
        first_name: Set(username.to_uppercase()),
        last_name: Set("Tester".to_string()),
        phone_number: Set("+250788123456".to_string()),
        address: Set("Kigali".to_string()),
        national_id: Set("1199080012345678".to_string()),
        signature: Set(Some("signatures/missing.png".to_string())),
        is_suspended: Set(suspended),
        suspended_at: Set(None),
        suspended_reason: Set(String::new()),
        suspended_by: Set(None),
        date_joined: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(app.state.db())
    .await
    .expect("Failed to create user");

    Account {
        token: token_for(&user),
        user,
    }
}

pub async fn seller(app: &TestApp, username: &str) -> Account {
    create_account(app, username, Some("seller"), false, false).await
}

pub async fn manager(app: &TestApp, username: &str) -> Account {
    create_account(app, username, Some("manager"), false, false).await
}

pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
}

pub async fn send_raw(
    app: &TestApp,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> RawResponse {
    let mut req = Request::builder().uri(uri).method(method);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap())),
        None => req.body(Body::empty()),
    }
    .unwrap();

    let response = app.router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    RawResponse {
        status,
        headers,
        bytes: bytes.to_vec(),
    }
}

pub async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let raw = send_raw(app, method, uri, token, body).await;
    let json = if raw.bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&raw.bytes).unwrap_or(Value::Null)
    };
    (raw.status, json)
}

/// Decimal fields serialize as strings.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("not a decimal: {}", other),
    }
}

pub fn png_data_url() -> String {
    let img = image::RgbImage::from_pixel(4, 4, image::Rgb([20, 40, 200]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

pub fn buy_payload(imei: &str, serial: &str, price: u64) -> Value {
    serde_json::json!({
        "imei": imei,
        "serial_number": serial,
        "brand": "Samsung",
        "model": "Galaxy A14",
        "color": "Black",
        "condition": "used",
        "purchase_price": price,
        "supplier_name": "Walk-in Supplier",
        "supplier_id": "1199080000000000",
        "supplier_phone": "+250788999999",
        "supplier_address": "Kigali",
    })
}

pub fn sell_payload(price: u64) -> Value {
    serde_json::json!({
        "buyer_name": "Jean Mugisha",
        "buyer_id": "1199080012345678",
        "buyer_phone": "+250788555444",
        "buyer_address": "Huye",
        "agreed_price": price,
        "payment_method": "mobile_money",
    })
}

/// Buy a phone through the API and return its id.
pub async fn buy_phone(app: &TestApp, account: &Account, imei: &str, serial: &str, price: u64) -> i32 {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/phones/buy",
        Some(&account.token),
        Some(buy_payload(imei, serial, price)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "buy failed: {}", body);
    body["agreement"]["phone"]["id"].as_i64().unwrap() as i32
}
