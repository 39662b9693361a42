mod common;

use axum::http::{Method, StatusCode};
use common::*;
use phonedesk::services::agreement_service::reload_owned_phone;
use phonedesk::services::ServiceError;
use sea_orm::TransactionTrait;
use serde_json::{json, Value};

async fn offer(app: &TestApp, from: &Account, phone_id: i32, to: &Account) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        &format!("/api/phones/{}/assign", phone_id),
        Some(&from.token),
        Some(json!({ "to_seller": to.user.id, "message": "Customer is near your shop" })),
    )
    .await
}

async fn phone(app: &TestApp, account: &Account, phone_id: i32) -> Value {
    let (status, body) = send(
        app,
        Method::GET,
        &format!("/api/phones/{}", phone_id),
        Some(&account.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["phone"].clone()
}

fn actions(phone: &Value) -> Vec<String> {
    phone["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["action"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_offer_marks_phone_assigned() {
    let app = setup_app().await;
    let alice = seller(&app, "alice").await;
    let bob = seller(&app, "bob").await;
    let phone_id = buy_phone(&app, &alice, "356938035643809", "R58T20ABCDE", 120000).await;

    let (status, body) = offer(&app, &alice, phone_id, &bob).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["assignment"]["status"], "pending");

    let detail = phone(&app, &alice, phone_id).await;
    assert_eq!(detail["status"], "assigned");
    assert_eq!(detail["current_owner_id"], alice.user.id);

    let (_, body) = send(&app, Method::GET, "/api/assignments", Some(&bob.token), None).await;
    let received = body["assignments"]["received"].as_array().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["phone_name"], "Samsung Galaxy A14");
    assert!(body["assignments"]["sent"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_approval_moves_phone_to_recipient() {
    let app = setup_app().await;
    let alice = seller(&app, "alice").await;
    let bob = seller(&app, "bob").await;
    let phone_id = buy_phone(&app, &alice, "356938035643809", "R58T20ABCDE", 120000).await;

    let (_, body) = offer(&app, &alice, phone_id, &bob).await;
    let assignment_id = body["assignment"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/assignments/{}/approve", assignment_id),
        Some(&bob.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assignment"]["status"], "approved");

    let detail = phone(&app, &bob, phone_id).await;
    assert_eq!(detail["status"], "available");
    assert_eq!(detail["current_owner_id"], bob.user.id);

    let history = actions(&detail);
    assert_eq!(history.iter().filter(|a| *a == "approve").count(), 1);
    assert_eq!(history.len(), 3);

    // The phone now shows up in Bob's inventory, not Alice's
    let (_, body) = send(&app, Method::GET, "/api/phones", Some(&bob.token), None).await;
    assert_eq!(body["phones"]["total_items"], 1);
    let (_, body) = send(&app, Method::GET, "/api/phones", Some(&alice.token), None).await;
    assert_eq!(body["phones"]["total_items"], 0);
}

#[tokio::test]
async fn test_rejection_returns_phone_to_sender() {
    let app = setup_app().await;
    let alice = seller(&app, "alice").await;
    let bob = seller(&app, "bob").await;
    let phone_id = buy_phone(&app, &alice, "356938035643809", "R58T20ABCDE", 120000).await;

    let (_, body) = offer(&app, &alice, phone_id, &bob).await;
    let assignment_id = body["assignment"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/assignments/{}/reject", assignment_id),
        Some(&bob.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assignment"]["status"], "rejected");

    let detail = phone(&app, &alice, phone_id).await;
    assert_eq!(detail["status"], "available");
    assert_eq!(detail["current_owner_id"], alice.user.id);
    assert_eq!(actions(&detail).iter().filter(|a| *a == "reject").count(), 1);
}

#[tokio::test]
async fn test_assignment_is_decided_once() {
    let app = setup_app().await;
    let alice = seller(&app, "alice").await;
    let bob = seller(&app, "bob").await;
    let phone_id = buy_phone(&app, &alice, "356938035643809", "R58T20ABCDE", 120000).await;

    let (_, body) = offer(&app, &alice, phone_id, &bob).await;
    let assignment_id = body["assignment"]["id"].as_i64().unwrap();
    let approve = format!("/api/assignments/{}/approve", assignment_id);

    let (status, _) = send(&app, Method::POST, &approve, Some(&bob.token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::POST, &approve, Some(&bob.token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/assignments/{}/reject", assignment_id),
        Some(&bob.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Still exactly one decision in the history
    let detail = phone(&app, &bob, phone_id).await;
    assert_eq!(actions(&detail).len(), 3);
}

#[tokio::test]
async fn test_only_recipient_can_decide() {
    let app = setup_app().await;
    let alice = seller(&app, "alice").await;
    let bob = seller(&app, "bob").await;
    let phone_id = buy_phone(&app, &alice, "356938035643809", "R58T20ABCDE", 120000).await;

    let (_, body) = offer(&app, &alice, phone_id, &bob).await;
    let assignment_id = body["assignment"]["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/assignments/{}/approve", assignment_id),
        Some(&alice.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_assigned_phone_cannot_be_offered_or_sold() {
    let app = setup_app().await;
    let alice = seller(&app, "alice").await;
    let bob = seller(&app, "bob").await;
    let carol = seller(&app, "carol").await;
    let phone_id = buy_phone(&app, &alice, "356938035643809", "R58T20ABCDE", 120000).await;

    offer(&app, &alice, phone_id, &bob).await;

    let (status, body) = offer(&app, &alice, phone_id, &carol).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only available phones can be assigned.");

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/phones/{}/sell", phone_id),
        Some(&alice.token),
        Some(sell_payload(150000)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cannot_assign_to_self_or_inactive_seller() {
    let app = setup_app().await;
    let alice = seller(&app, "alice").await;
    let held = create_account(&app, "held", Some("seller"), false, true).await;
    let phone_id = buy_phone(&app, &alice, "356938035643809", "R58T20ABCDE", 120000).await;

    let (status, body) = offer(&app, &alice, phone_id, &alice).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You cannot assign a phone to yourself.");

    let (status, body) = offer(&app, &alice, phone_id, &held).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid seller selected.");

    let detail = phone(&app, &alice, phone_id).await;
    assert_eq!(detail["status"], "available");
}

#[tokio::test]
async fn test_only_owner_can_offer() {
    let app = setup_app().await;
    let alice = seller(&app, "alice").await;
    let bob = seller(&app, "bob").await;
    let phone_id = buy_phone(&app, &alice, "356938035643809", "R58T20ABCDE", 120000).await;

    let (status, _) = offer(&app, &bob, phone_id, &alice).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/phones/{}/assign", phone_id),
        Some(&alice.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let sellers: Vec<&str> = body["sellers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["username"].as_str().unwrap())
        .collect();
    assert_eq!(sellers, vec!["bob"]);
}

#[tokio::test]
async fn test_in_transaction_reread_rechecks_owner() {
    let app = setup_app().await;
    let alice = seller(&app, "alice").await;
    let bob = seller(&app, "bob").await;
    let phone_id = buy_phone(&app, &alice, "356938035643809", "R58T20ABCDE", 120000).await;

    // Alice's earlier checks passed, then the phone changed hands
    let (_, body) = offer(&app, &alice, phone_id, &bob).await;
    let assignment_id = body["assignment"]["id"].as_i64().unwrap();
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/assignments/{}/approve", assignment_id),
        Some(&bob.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let txn = app.state.db().begin().await.unwrap();
    let stale = reload_owned_phone(&txn, phone_id, alice.user.id).await;
    match stale {
        Err(ServiceError::InvalidState(msg)) => {
            assert_eq!(msg, "This phone is no longer in your inventory.")
        }
        other => panic!("expected the owner check to fail, got {:?}", other.map(|p| p.id)),
    }
    let fresh = reload_owned_phone(&txn, phone_id, bob.user.id).await.unwrap();
    assert_eq!(fresh.current_owner_id, bob.user.id);
    txn.rollback().await.unwrap();

    let missing = reload_owned_phone(app.state.db(), 999, bob.user.id).await;
    assert!(matches!(missing, Err(ServiceError::NotFound("Phone"))));
}
