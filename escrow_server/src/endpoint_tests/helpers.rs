#![allow(dead_code)]
use std::sync::Arc;

use actix_web::{
    body::MessageBody,
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use escrow_engine::{
    db_types::{NewOrder, Order, ProfileId},
    notifications::{LogNotifier, NotificationDispatcher},
    DisputeApi,
    InsertOrderResult,
    OrderFlowApi,
    QuoteApi,
    SqliteDatabase,
};
use mes_common::{MinorUnits, Secret};
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::{
    auth::{PROFILE_ID_HEADER, ROLES_HEADER},
    config::SIGNATURE_HEADER,
    helpers::calculate_hmac,
    middleware::HmacMiddlewareFactory,
    routes::{
        health,
        AcceptQuoteRoute,
        CancelOrderRoute,
        CreateQuoteRequestRoute,
        DisputeForOrderRoute,
        OpenDisputeRoute,
        OrderByNumberRoute,
        QuoteRequestByIdRoute,
        ResolveDisputeRoute,
        SubmitQuoteRoute,
        UpdateOrderStatusRoute,
    },
    webhook_routes::PaymentWebhookRoute,
};

pub const TEST_HMAC_SECRET: &str = "test-webhook-secret";

/// Creates a fresh on-disk test database, runs the migrations and returns a handle.
pub async fn new_test_db() -> SqliteDatabase {
    let _ = env_logger::try_init();
    let path = std::env::temp_dir().join(format!("mes_server_test_{}.db", rand::random::<u64>()));
    let url = format!("sqlite://{}", path.display());
    let _ = Sqlite::drop_database(&url).await;
    Sqlite::create_database(&url).await.expect("Error creating test database");
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error connecting to test database");
    db.migrate().await.expect("Error running migrations");
    db
}

/// Registers the same scopes as the real server instance against a test database.
fn configure_app(db: SqliteDatabase) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let notifier: Arc<dyn NotificationDispatcher> = Arc::new(LogNotifier);
        let orders_api = OrderFlowApi::new(db.clone(), Arc::clone(&notifier));
        let disputes_api = DisputeApi::new(db.clone(), Arc::clone(&notifier));
        let quotes_api = QuoteApi::new(db, notifier);
        let webhook_scope = web::scope("/webhook")
            .wrap(HmacMiddlewareFactory::new(SIGNATURE_HEADER, Secret::new(TEST_HMAC_SECRET.to_string()), true))
            .service(PaymentWebhookRoute::<SqliteDatabase>::new());
        let api_scope = web::scope("/api")
            .service(OrderByNumberRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(DisputeForOrderRoute::<SqliteDatabase>::new())
            .service(OpenDisputeRoute::<SqliteDatabase>::new())
            .service(ResolveDisputeRoute::<SqliteDatabase>::new())
            .service(CreateQuoteRequestRoute::<SqliteDatabase>::new())
            .service(QuoteRequestByIdRoute::<SqliteDatabase>::new())
            .service(SubmitQuoteRoute::<SqliteDatabase>::new())
            .service(AcceptQuoteRoute::<SqliteDatabase>::new());
        cfg.app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(disputes_api))
            .app_data(web::Data::new(quotes_api))
            .service(health)
            .service(webhook_scope)
            .service(api_scope);
    }
}

/// Runs one request against a freshly built app. Middleware rejections surface as `Err((status, message))`,
/// handler results as `Ok((status, body))`.
pub async fn call_api(
    db: SqliteDatabase,
    req: TestRequest,
) -> Result<(StatusCode, String), (StatusCode, String)> {
    let service = test::init_service(App::new().configure(configure_app(db))).await;
    let (_, res) = test::try_call_service(&service, req.to_request())
        .await
        .map_err(|e| (e.as_response_error().status_code(), e.to_string()))?
        .into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

pub fn sign(body: &str) -> String {
    calculate_hmac(TEST_HMAC_SECRET, body.as_bytes()).unwrap()
}

/// A signed webhook POST with a raw string payload.
pub fn webhook_request(body: &str, signature: Option<&str>) -> TestRequest {
    let mut req = TestRequest::post()
        .uri("/webhook/payment")
        .insert_header(("content-type", "application/json"))
        .set_payload(body.to_string());
    if let Some(sig) = signature {
        req = req.insert_header((SIGNATURE_HEADER, sig));
    }
    req
}

pub fn as_member(req: TestRequest, profile_id: &str) -> TestRequest {
    req.insert_header((PROFILE_ID_HEADER, profile_id))
}

pub fn as_arbitrator(req: TestRequest, profile_id: &str) -> TestRequest {
    req.insert_header((PROFILE_ID_HEADER, profile_id)).insert_header((ROLES_HEADER, "arbitrator"))
}

/// Seeds an order straight through the engine, sidestepping the webhook.
pub async fn seed_order(db: &SqliteDatabase, payment_ref: &str) -> Order {
    let api = OrderFlowApi::new(db.clone(), Arc::new(LogNotifier));
    let order = NewOrder {
        client_id: ProfileId::from("client-1"),
        seller_id: ProfileId::from("seller-1"),
        amount: MinorUnits::from(10_000),
        currency: "EUR".to_string(),
        platform_fee: MinorUnits::from(350),
        external_payment_ref: payment_ref.to_string(),
    };
    match api.process_captured_payment(order).await.expect("Error creating order") {
        InsertOrderResult::Inserted(o) => o,
        InsertOrderResult::AlreadyExists(o) => panic!("Order {} unexpectedly existed already", o.order_number),
    }
}
