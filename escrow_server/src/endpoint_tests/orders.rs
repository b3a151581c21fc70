use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::{json, Value};

use super::helpers::{as_arbitrator, as_member, call_api, new_test_db, seed_order};

#[actix_web::test]
async fn api_requires_an_identity() {
    let db = new_test_db().await;
    let order = seed_order(&db, "pay_1").await;
    let req = TestRequest::get().uri(&format!("/api/orders/{}", order.order_number.as_str()));
    let (status, body) = call_api(db, req).await.unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["error"], "No authenticated profile identity was supplied with the request");
}

#[actix_web::test]
async fn parties_see_the_order_and_its_ledger() {
    let db = new_test_db().await;
    let order = seed_order(&db, "pay_1").await;
    let uri = format!("/api/orders/{}", order.order_number.as_str());
    let (status, body) = call_api(db.clone(), as_member(TestRequest::get().uri(&uri), "client-1")).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["order"]["status"], "in_progress");
    assert_eq!(body["order"]["escrow_status"], "held");
    assert_eq!(body["order"]["seller_earnings"], 9_650);
    assert_eq!(body["transactions"][0]["txn_type"], "payment");

    // A stranger gets 403, a missing order 404.
    let (status, _) = call_api(db.clone(), as_member(TestRequest::get().uri(&uri), "someone-else")).await.unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) =
        call_api(db, as_member(TestRequest::get().uri("/api/orders/MKT-MISSING000"), "client-1")).await.unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn fulfilment_over_http() {
    let db = new_test_db().await;
    let order = seed_order(&db, "pay_1").await;
    let status_uri = format!("/api/orders/{}/status", order.order_number.as_str());

    // Skipping ahead is refused.
    let req = as_member(TestRequest::post().uri(&status_uri), "client-1").set_json(json!({"status": "completed"}));
    let (status, _) = call_api(db.clone(), req).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = as_member(TestRequest::post().uri(&status_uri), "seller-1").set_json(json!({"status": "delivered"}));
    let (status, body) = call_api(db.clone(), req).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["status"], "delivered");

    let req = as_member(TestRequest::post().uri(&status_uri), "client-1").set_json(json!({"status": "completed"}));
    let (status, body) = call_api(db.clone(), req).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["status"], "completed");
    assert_eq!(body["escrow_status"], "released");
}

#[actix_web::test]
async fn cancellation_over_http() {
    let db = new_test_db().await;
    let order = seed_order(&db, "pay_1").await;
    let uri = format!("/api/orders/{}/cancel", order.order_number.as_str());
    let (status, body) = call_api(db.clone(), as_member(TestRequest::post().uri(&uri), "client-1")).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["status"], "cancelled");
    assert_eq!(body["escrow_status"], "refunded");

    // Terminal states are sticky.
    let (status, _) = call_api(db, as_member(TestRequest::post().uri(&uri), "client-1")).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn dispute_lifecycle_over_http() {
    let db = new_test_db().await;
    let order = seed_order(&db, "pay_1").await;
    let dispute_uri = format!("/api/orders/{}/dispute", order.order_number.as_str());

    // Nothing to see yet.
    let (status, body) = call_api(db.clone(), as_member(TestRequest::get().uri(&dispute_uri), "client-1")).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert!(body["dispute"].is_null());

    let open = json!({
        "reason": "not_delivered",
        "description": "Nothing was delivered by the agreed date",
        "evidence": [{ "type": "text", "content": "Chat log from 2024-06-02" }]
    });
    let req = as_member(TestRequest::post().uri(&dispute_uri), "client-1").set_json(open.clone());
    let (status, body) = call_api(db.clone(), req).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let dispute: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(dispute["status"], "open");
    let dispute_id = dispute["id"].as_i64().unwrap();

    // Second dispute on the same order is a conflict.
    let req = as_member(TestRequest::post().uri(&dispute_uri), "seller-1").set_json(open);
    let (status, _) = call_api(db.clone(), req).await.unwrap();
    assert_eq!(status, StatusCode::CONFLICT);

    // Resolution requires the arbitrator role.
    let resolve_uri = format!("/api/disputes/{dispute_id}/resolve");
    let ruling = json!({ "resolution": "partial_refund", "seller_amount": 4_000, "note": "Split per evidence" });
    let req = as_member(TestRequest::post().uri(&resolve_uri), "client-1").set_json(ruling.clone());
    let (status, _) = call_api(db.clone(), req).await.unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = as_arbitrator(TestRequest::post().uri(&resolve_uri), "arb-1").set_json(ruling);
    let (status, body) = call_api(db.clone(), req).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["dispute"]["status"], "resolved");
    assert_eq!(body["dispute"]["resolution"], "partial_refund");
    assert_eq!(body["order"]["status"], "completed");
    assert_eq!(body["order"]["escrow_status"], "released");
}
