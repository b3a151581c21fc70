use actix_web::{http::StatusCode, test::TestRequest};
use escrow_engine::SqliteDatabase;
use serde_json::{json, Value};

use super::helpers::{as_member, call_api, new_test_db};

fn request_body() -> Value {
    json!({
        "category_id": "home-renovation",
        "title": "Repaint two rooms",
        "description": "Two bedrooms, walls and ceilings, paint included",
        "location": "Lisbon",
        "budget": 20_000
    })
}

fn quote_body(amount: i64) -> Value {
    json!({
        "amount": amount,
        "currency": "EUR",
        "description": "Can start next week",
        "estimated_days": 5
    })
}

async fn post_request(db: &SqliteDatabase) -> i64 {
    let req = as_member(TestRequest::post().uri("/api/quote-requests"), "client-1").set_json(request_body());
    let (status, body) = call_api(db.clone(), req).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    body["id"].as_i64().unwrap()
}

async fn post_quote(db: &SqliteDatabase, request_id: i64, seller: &str, amount: i64) -> (StatusCode, Value) {
    let uri = format!("/api/quote-requests/{request_id}/quotes");
    let req = as_member(TestRequest::post().uri(&uri), seller).set_json(quote_body(amount));
    let (status, body) = call_api(db.clone(), req).await.unwrap();
    (status, serde_json::from_str(&body).unwrap())
}

#[actix_web::test]
async fn three_sellers_compete_and_one_wins() {
    let db = new_test_db().await;
    let request_id = post_request(&db).await;

    let (status, _) = post_quote(&db, request_id, "seller-a", 10_000).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post_quote(&db, request_id, "seller-b", 15_000).await;
    assert_eq!(status, StatusCode::OK);
    let (status, cheapest) = post_quote(&db, request_id, "seller-c", 9_000).await;
    assert_eq!(status, StatusCode::OK);
    let cheapest_id = cheapest["id"].as_i64().unwrap();

    // One quote per seller per request.
    let (status, _) = post_quote(&db, request_id, "seller-a", 8_000).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Only the request's client may accept.
    let accept_uri = format!("/api/quotes/{cheapest_id}/accept");
    let (status, _) = call_api(db.clone(), as_member(TestRequest::post().uri(&accept_uri), "seller-a")).await.unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call_api(db.clone(), as_member(TestRequest::post().uri(&accept_uri), "client-1")).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["quote"]["status"], "accepted");
    assert_eq!(body["request"]["status"], "closed");

    // The request view shows one accepted and two rejected quotes.
    let uri = format!("/api/quote-requests/{request_id}");
    let (status, body) = call_api(db.clone(), as_member(TestRequest::get().uri(&uri), "client-1")).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["request"]["quote_count"], 3);
    let quotes = body["quotes"].as_array().unwrap();
    assert_eq!(quotes.iter().filter(|q| q["status"] == "accepted").count(), 1);
    assert_eq!(quotes.iter().filter(|q| q["status"] == "rejected").count(), 2);

    // Late arrivals bounce off the closed request.
    let (status, _) = post_quote(&db, request_id, "seller-d", 7_000).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn missing_request_and_invalid_submissions() {
    let db = new_test_db().await;
    let request_id = post_request(&db).await;

    let (status, _) = post_quote(&db, 9_999, "seller-a", 10_000).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Bidding on your own request is refused.
    let (status, _) = post_quote(&db, request_id, "client-1", 10_000).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_quote(&db, request_id, "seller-a", 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
