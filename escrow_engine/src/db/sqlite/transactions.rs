use log::trace;
use mes_common::MinorUnits;
use sqlx::SqliteConnection;

use crate::db_types::{Transaction, TransactionType};

/// Appends one ledger line. The ledger is append-only; there is no update or delete counterpart.
pub async fn insert_transaction(
    order_id: i64,
    txn_type: TransactionType,
    amount: MinorUnits,
    currency: &str,
    conn: &mut SqliteConnection,
) -> Result<i64, sqlx::Error> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO transactions (order_id, txn_type, amount, currency) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(order_id)
    .bind(txn_type)
    .bind(amount)
    .bind(currency)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Ledger line {txn_type} of {amount} appended for order id {order_id}");
    Ok(id)
}

pub async fn fetch_transactions_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        "SELECT id, order_id, txn_type, amount, currency, created_at FROM transactions WHERE order_id = $1 ORDER BY \
         id ASC",
    )
    .bind(order_id)
    .fetch_all(conn)
    .await
}
