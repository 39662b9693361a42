mod common;

use axum::http::{header, Method, StatusCode};
use common::*;
use phonedesk::models::{agreement, phone_history, sales_transaction};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, EntityTrait, ModelTrait, PaginatorTrait, Set, Statement,
};
use serde_json::json;

#[tokio::test]
async fn test_buy_creates_phone_agreement_and_history() {
    let app = setup_app().await;
    let alice = seller(&app, "alice").await;

    let mut payload = buy_payload("356938035643809", "R58T20ABCDE", 120000);
    payload["supplier_id_photo"] = json!(png_data_url());
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/phones/buy",
        Some(&alice.token),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    let detail = &body["agreement"];
    assert_eq!(detail["reference"], "AGR-000001");
    assert_eq!(detail["agreement"]["agreement_type"], "buy");
    assert_eq!(detail["phone"]["status"], "available");
    assert_eq!(detail["phone"]["current_owner_id"], alice.user.id);
    assert_eq!(decimal(&detail["phone"]["purchase_price"]), Decimal::from(120000));
    assert!(detail["agreement"]["id_photo"]
        .as_str()
        .unwrap()
        .starts_with("id_photos/"));
    assert!(detail["transaction"].is_null());

    let history = phone_history::Entity::find().all(app.state.db()).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action, "buy");
    assert_eq!(history[0].agreement_id, Some(1));
}

#[tokio::test]
async fn test_buy_rejects_duplicate_imei_and_incomplete_profile() {
    let app = setup_app().await;
    let alice = seller(&app, "alice").await;
    buy_phone(&app, &alice, "356938035643809", "R58T20ABCDE", 120000).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/phones/buy",
        Some(&alice.token),
        Some(buy_payload("356938035643809", "OTHER-SERIAL", 90000)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "A phone with this IMEI already exists.");

    // A fresh account without address, national ID or signature
    let (_, registered) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "username": "fresh",
            "phone_number": "+250788000111",
            "password1": "pw",
            "password2": "pw",
        })),
    )
    .await;
    let fresh_id = registered["user"]["id"].as_i64().unwrap();
    let boss = manager(&app, "boss").await;
    send(
        &app,
        Method::POST,
        &format!("/api/manager/sellers/{}/approve", fresh_id),
        Some(&boss.token),
        Some(json!({ "action": "approve" })),
    )
    .await;
    let (_, login) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "fresh", "password": "pw" })),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/phones/buy",
        login["token"].as_str(),
        Some(buy_payload("861234050987654", "TECNO7X9Y8Z", 85000)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Please complete your profile before creating agreements."
    );
}

#[tokio::test]
async fn test_sell_records_transaction_financials() {
    let app = setup_app().await;
    let alice = seller(&app, "alice").await;
    let phone_id = buy_phone(&app, &alice, "356938035643809", "R58T20ABCDE", 120000).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/phones/{}/sell", phone_id),
        Some(&alice.token),
        Some(sell_payload(150000)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    let detail = &body["agreement"];
    assert_eq!(detail["agreement"]["agreement_type"], "sell");
    assert_eq!(detail["phone"]["status"], "sold");

    let txn = &detail["transaction"];
    assert_eq!(txn["transaction_id"], "TXN-2");
    assert_eq!(txn["status"], "completed");
    assert_eq!(txn["payment_method"], "mobile_money");
    assert_eq!(decimal(&txn["sale_price"]), Decimal::from(150000));
    assert_eq!(decimal(&txn["cost_price"]), Decimal::from(120000));
    assert_eq!(decimal(&txn["profit"]), Decimal::from(30000));
    assert_eq!(decimal(&txn["commission_amount"]), Decimal::from(3000));

    // The buyer became a customer
    let boss = manager(&app, "boss").await;
    let (_, body) = send(&app, Method::GET, "/api/customers", Some(&boss.token), None).await;
    let customers = body["customers"]["items"].as_array().unwrap();
    assert_eq!(customers.len(), 1);
    assert_eq!(customers[0]["phone"], "+250788555444");
    assert_eq!(customers[0]["total_purchases"], 1);
    assert_eq!(decimal(&customers[0]["total_spent"]), Decimal::from(150000));
}

#[tokio::test]
async fn test_sold_phone_is_terminal() {
    let app = setup_app().await;
    let alice = seller(&app, "alice").await;
    let bob = seller(&app, "bob").await;
    let phone_id = buy_phone(&app, &alice, "356938035643809", "R58T20ABCDE", 120000).await;
    let sell_uri = format!("/api/phones/{}/sell", phone_id);

    let (status, _) = send(&app, Method::POST, &sell_uri, Some(&alice.token), Some(sell_payload(150000))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, Method::POST, &sell_uri, Some(&alice.token), Some(sell_payload(160000))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "This phone is not available for sale.");

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/phones/{}/assign", phone_id),
        Some(&alice.token),
        Some(json!({ "to_seller": bob.user.id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let transactions = sales_transaction::Entity::find()
        .count(app.state.db())
        .await
        .unwrap();
    assert_eq!(transactions, 1);
}

#[tokio::test]
async fn test_only_owner_can_sell() {
    let app = setup_app().await;
    let alice = seller(&app, "alice").await;
    let bob = seller(&app, "bob").await;
    let phone_id = buy_phone(&app, &alice, "356938035643809", "R58T20ABCDE", 120000).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/phones/{}/sell", phone_id),
        Some(&bob.token),
        Some(sell_payload(150000)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You can only sell phones from your own inventory.");

    // Managers sell from their own stock too
    let boss = manager(&app, "boss").await;
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/phones/{}/sell", phone_id),
        Some(&boss.token),
        Some(sell_payload(150000)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_failed_sale_leaves_no_trace() {
    let app = setup_app().await;
    let alice = seller(&app, "alice").await;
    let phone_id = buy_phone(&app, &alice, "356938035643809", "R58T20ABCDE", 120000).await;

    // Occupy the transaction id the sale would be given
    sales_transaction::ActiveModel {
        transaction_id: Set("TXN-2".to_string()),
        seller_id: Set(alice.user.id),
        phone_id: Set(phone_id),
        agreement_id: Set(None),
        customer_name: Set("Someone".to_string()),
        customer_phone: Set("+250788000000".to_string()),
        customer_email: Set(String::new()),
        sale_price: Set(Decimal::from(1000)),
        cost_price: Set(Decimal::from(500)),
        commission_rate: Set(Decimal::TEN),
        payment_method: Set("cash".to_string()),
        payment_reference: Set(String::new()),
        status: Set("cancelled".to_string()),
        notes: Set(String::new()),
        sale_date: Set("2024-01-01 10:00:00".to_string()),
        created_at: Set("2024-01-01 10:00:00".to_string()),
        updated_at: Set("2024-01-01 10:00:00".to_string()),
        ..Default::default()
    }
    .insert(app.state.db())
    .await
    .unwrap();

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/phones/{}/sell", phone_id),
        Some(&alice.token),
        Some(sell_payload(150000)),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let db = app.state.db();
    assert_eq!(agreement::Entity::find().count(db).await.unwrap(), 1);
    assert_eq!(phone_history::Entity::find().count(db).await.unwrap(), 1);
    assert_eq!(
        phonedesk::models::customer::Entity::find().count(db).await.unwrap(),
        0
    );

    let phone = phonedesk::models::phone::Entity::find_by_id(phone_id)
        .one(db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(phone.status, "available");
}

#[tokio::test]
async fn test_audit_records_refuse_changes() {
    let app = setup_app().await;
    let alice = seller(&app, "alice").await;
    buy_phone(&app, &alice, "356938035643809", "R58T20ABCDE", 120000).await;
    let db = app.state.db();

    let signed = agreement::Entity::find_by_id(1).one(db).await.unwrap().unwrap();
    let mut edited: agreement::ActiveModel = signed.clone().into();
    edited.price = Set(Decimal::ONE);
    assert!(edited.update(db).await.is_err());
    assert!(signed.clone().delete(db).await.is_err());

    let entry = phone_history::Entity::find().one(db).await.unwrap().unwrap();
    let mut rewritten: phone_history::ActiveModel = entry.into();
    rewritten.notes = Set("changed".to_string());
    assert!(rewritten.update(db).await.is_err());

    // Around the ORM as well
    let backend = db.get_database_backend();
    assert!(db
        .execute(Statement::from_string(backend, "UPDATE agreements SET price = 1".to_owned()))
        .await
        .is_err());
    assert!(db
        .execute(Statement::from_string(backend, "UPDATE phone_history SET notes = 'x'".to_owned()))
        .await
        .is_err());

    let unchanged = agreement::Entity::find_by_id(1).one(db).await.unwrap().unwrap();
    assert_eq!(unchanged, signed);
}

#[tokio::test]
async fn test_agreement_listing_is_scoped_to_seller() {
    let app = setup_app().await;
    let alice = seller(&app, "alice").await;
    let bob = seller(&app, "bob").await;
    let boss = manager(&app, "boss").await;
    buy_phone(&app, &alice, "356938035643809", "R58T20ABCDE", 120000).await;
    buy_phone(&app, &bob, "353918106789012", "F2LXK0QWERTY", 310000).await;

    let (_, body) = send(&app, Method::GET, "/api/agreements", Some(&alice.token), None).await;
    assert_eq!(body["agreements"]["total_items"], 1);

    let (_, body) = send(&app, Method::GET, "/api/agreements", Some(&boss.token), None).await;
    assert_eq!(body["agreements"]["total_items"], 2);

    let (_, body) = send(
        &app,
        Method::GET,
        "/api/agreements?search=AGR-000002",
        Some(&boss.token),
        None,
    )
    .await;
    assert_eq!(body["agreements"]["total_items"], 1);

    let (status, _) = send(&app, Method::GET, "/api/agreements/2", Some(&alice.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_agreement_pdf_download() {
    let app = setup_app().await;
    let alice = seller(&app, "alice").await;
    let phone_id = buy_phone(&app, &alice, "356938035643809", "R58T20ABCDE", 120000).await;
    let mut sale = sell_payload(150000);
    sale["buyer_signature_photo"] = json!(png_data_url());
    send(
        &app,
        Method::POST,
        &format!("/api/phones/{}/sell", phone_id),
        Some(&alice.token),
        Some(sale),
    )
    .await;

    let raw = send_raw(&app, Method::GET, "/api/agreements/2/pdf", Some(&alice.token), None).await;
    assert_eq!(raw.status, StatusCode::OK);
    assert_eq!(raw.headers.get(header::CONTENT_TYPE).unwrap(), "application/pdf");
    let disposition = raw
        .headers
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(disposition.starts_with("attachment; filename=\"Agreement_2_"));
    assert!(disposition.ends_with(".pdf\""));
    assert!(raw.bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_captured_photos_need_a_signed_in_user() {
    let app = setup_app().await;
    let alice = seller(&app, "alice").await;

    let mut payload = buy_payload("356938035643809", "R58T20ABCDE", 120000);
    payload["supplier_id_photo"] = json!(png_data_url());
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/phones/buy",
        Some(&alice.token),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let uri = format!(
        "/media/{}",
        body["agreement"]["agreement"]["id_photo"].as_str().unwrap()
    );

    let anonymous = send_raw(&app, Method::GET, &uri, None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert!(!anonymous.bytes.starts_with(b"\x89PNG"));

    let forged = send_raw(&app, Method::GET, &uri, Some("not-a-token"), None).await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);

    let served = send_raw(&app, Method::GET, &uri, Some(&alice.token), None).await;
    assert_eq!(served.status, StatusCode::OK);
    assert_eq!(served.headers[header::CONTENT_TYPE], "image/png");
    assert!(served.bytes.starts_with(b"\x89PNG"));

    let missing = send_raw(&app, Method::GET, "/media/id_photos/none.png", Some(&alice.token), None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}
