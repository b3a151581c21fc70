#![allow(dead_code)]
use std::sync::Arc;

use escrow_engine::{
    db_types::{NewOrder, Order, ProfileId},
    notifications::LogNotifier,
    InsertOrderResult,
    OrderFlowApi,
    SqliteDatabase,
};
use mes_common::MinorUnits;
use sqlx::{migrate::MigrateDatabase, Sqlite};

/// Creates a fresh on-disk test database, runs the migrations and returns a handle.
pub async fn new_test_db() -> SqliteDatabase {
    let _ = env_logger::try_init();
    let path = std::env::temp_dir().join(format!("mes_test_{}.db", rand::random::<u64>()));
    let url = format!("sqlite://{}", path.display());
    let _ = Sqlite::drop_database(&url).await;
    Sqlite::create_database(&url).await.expect("Error creating test database");
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error connecting to test database");
    db.migrate().await.expect("Error running migrations");
    db
}

pub fn order_api(db: &SqliteDatabase) -> OrderFlowApi<SqliteDatabase> {
    OrderFlowApi::new(db.clone(), Arc::new(LogNotifier))
}

pub fn new_order(external_ref: &str) -> NewOrder {
    NewOrder {
        client_id: ProfileId::from("client-1"),
        seller_id: ProfileId::from("seller-1"),
        amount: MinorUnits::from(10_000),
        currency: "EUR".to_string(),
        platform_fee: MinorUnits::from(350),
        external_payment_ref: external_ref.to_string(),
    }
}

/// Captures a payment and returns the freshly created order.
pub async fn create_order(api: &OrderFlowApi<SqliteDatabase>, external_ref: &str) -> Order {
    match api.process_captured_payment(new_order(external_ref)).await.expect("Error creating order") {
        InsertOrderResult::Inserted(o) => o,
        InsertOrderResult::AlreadyExists(o) => panic!("Order {} unexpectedly existed already", o.order_number),
    }
}
