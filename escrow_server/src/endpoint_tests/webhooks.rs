use actix_web::http::StatusCode;
use escrow_engine::MarketplaceDatabase;
use serde_json::Value;

use super::helpers::{call_api, new_test_db, sign, webhook_request};

const CAPTURED: &str = r#"{
    "event_type": "payment_captured",
    "payment_ref": "pay_555",
    "client_id": "client-1",
    "seller_id": "seller-1",
    "amount": 10000,
    "currency": "EUR",
    "platform_fee": 350
}"#;

#[actix_web::test]
async fn missing_signature_is_rejected() {
    let db = new_test_db().await;
    let (status, message) = call_api(db, webhook_request(CAPTURED, None)).await.expect_err("Expected error");
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message, "No HMAC signature found.");
}

#[actix_web::test]
async fn invalid_signature_is_rejected() {
    let db = new_test_db().await;
    let (status, message) = call_api(db.clone(), webhook_request(CAPTURED, Some("bm90LXRoZS1zaWduYXR1cmU=")))
        .await
        .expect_err("Expected error");
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message, "Invalid HMAC signature.");
    // The rejected delivery left no trace.
    assert!(db.fetch_order_by_payment_ref("pay_555").await.unwrap().is_none());
}

#[actix_web::test]
async fn captured_payment_creates_an_order_once() {
    let db = new_test_db().await;
    let sig = sign(CAPTURED);
    let (status, body) = call_api(db.clone(), webhook_request(CAPTURED, Some(&sig))).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(res["success"], true);

    // Replays are acknowledged without side effects.
    let (status, body) = call_api(db.clone(), webhook_request(CAPTURED, Some(&sig))).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(res["success"], true);
    assert_eq!(res["message"], "Payment already processed.");

    let order = db.fetch_order_by_payment_ref("pay_555").await.unwrap().expect("Order should exist");
    let lines = db.fetch_transactions_for_order(order.id).await.unwrap();
    assert_eq!(lines.len(), 1);
}

#[actix_web::test]
async fn garbage_payload_with_valid_signature_still_returns_200() {
    let db = new_test_db().await;
    let body = "this is not json";
    let sig = sign(body);
    let (status, res) = call_api(db, webhook_request(body, Some(&sig))).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&res).unwrap();
    assert_eq!(res["success"], false);
}

#[actix_web::test]
async fn event_missing_party_refs_is_dropped_with_200() {
    let db = new_test_db().await;
    let body = r#"{
        "event_type": "payment_captured",
        "payment_ref": "pay_556",
        "client_id": "client-1",
        "amount": 10000,
        "currency": "EUR"
    }"#;
    let sig = sign(body);
    let (status, res) = call_api(db.clone(), webhook_request(body, Some(&sig))).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&res).unwrap();
    assert_eq!(res["success"], false);
    assert!(db.fetch_order_by_payment_ref("pay_556").await.unwrap().is_none());
}

#[actix_web::test]
async fn unknown_event_types_are_acknowledged() {
    let db = new_test_db().await;
    let body = r#"{ "event_type": "payout_settled", "payout_ref": "po_9" }"#;
    let sig = sign(body);
    let (status, res) = call_api(db, webhook_request(body, Some(&sig))).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&res).unwrap();
    assert_eq!(res["success"], true);
}

#[actix_web::test]
async fn failed_payment_notifies_without_creating_an_order() {
    let db = new_test_db().await;
    let body = r#"{
        "event_type": "payment_failed",
        "payment_ref": "pay_557",
        "client_id": "client-1",
        "reason": "card declined"
    }"#;
    let sig = sign(body);
    let (status, res) = call_api(db.clone(), webhook_request(body, Some(&sig))).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&res).unwrap();
    assert_eq!(res["success"], true);
    assert!(db.fetch_order_by_payment_ref("pay_557").await.unwrap().is_none());
}
