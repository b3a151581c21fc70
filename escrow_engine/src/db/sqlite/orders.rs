use log::trace;
use mes_common::MinorUnits;
use sqlx::SqliteConnection;

use crate::db_types::{NewOrder, Order, OrderNumber, OrderStatusType};

/// Inserts the order idempotently against the unique index on `external_payment_ref`.
///
/// Returns `Some(id)` when the row was inserted, and `None` when an order for the same payment reference already
/// exists (a duplicate webhook delivery). A collision on `order_number` is surfaced as a database error; the caller
/// retries with a fresh candidate.
pub async fn idempotent_insert(
    order: &NewOrder,
    order_number: &str,
    seller_earnings: MinorUnits,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, sqlx::Error> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
            INSERT INTO orders (
                order_number,
                client_id,
                seller_id,
                amount,
                currency,
                platform_fee,
                seller_earnings,
                external_payment_ref,
                status,
                escrow_status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'in_progress', 'held')
            ON CONFLICT (external_payment_ref) DO NOTHING
            RETURNING id
        "#,
    )
    .bind(order_number)
    .bind(&order.client_id)
    .bind(&order.seller_id)
    .bind(order.amount)
    .bind(&order.currency)
    .bind(order.platform_fee)
    .bind(seller_earnings)
    .bind(&order.external_payment_ref)
    .fetch_optional(conn)
    .await?;
    trace!("🗃️ idempotent_insert for payment ref {} -> {id:?}", order.external_payment_ref);
    Ok(id)
}

const ORDER_COLUMNS: &str = r#"
    SELECT id, order_number, client_id, seller_id, amount, currency, platform_fee, seller_earnings,
           external_payment_ref, status, escrow_status, created_at, updated_at, completed_at
    FROM orders
"#;

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>(&format!("{ORDER_COLUMNS} WHERE id = $1")).bind(id).fetch_optional(conn).await
}

pub async fn fetch_order_by_number(
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>(&format!("{ORDER_COLUMNS} WHERE order_number = $1"))
        .bind(number)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_order_by_payment_ref(
    external_ref: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>(&format!("{ORDER_COLUMNS} WHERE external_payment_ref = $1"))
        .bind(external_ref)
        .fetch_optional(conn)
        .await
}

/// Compare-and-set status write, guarded on the current status still being `expected`. A zero row count means a
/// concurrent writer moved the order first; the caller surfaces that as a conflict instead of clobbering the newer
/// status.
pub async fn update_order_status(
    order_id: i64,
    expected: OrderStatusType,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let res = sqlx::query("UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND status = $3")
        .bind(status)
        .bind(order_id)
        .bind(expected)
        .execute(conn)
        .await?;
    Ok(res.rows_affected() > 0)
}

/// Moves the order to `completed`/`released` and stamps `completed_at`. The `escrow_status = 'held'` guard makes the
/// write conditional: a zero row count means escrow had already been settled.
pub async fn settle_as_completed(order_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let res = sqlx::query(
        r#"
            UPDATE orders
            SET status = 'completed', escrow_status = 'released',
                completed_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND escrow_status = 'held'
        "#,
    )
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(res.rows_affected() > 0)
}

/// Moves the order to `cancelled`/`refunded`, guarded on escrow still being `held`.
pub async fn settle_as_cancelled(order_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let res = sqlx::query(
        r#"
            UPDATE orders
            SET status = 'cancelled', escrow_status = 'refunded', updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND escrow_status = 'held'
        "#,
    )
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(res.rows_affected() > 0)
}
