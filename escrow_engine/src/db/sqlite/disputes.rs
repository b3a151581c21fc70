use mes_common::MinorUnits;
use sqlx::SqliteConnection;

use crate::db_types::{Dispute, NewDispute, ProfileId};

/// Inserts a dispute with `open` status. The partial unique index on active disputes is the single-active-dispute
/// guard; a violation propagates as a database error for the caller to classify.
pub async fn insert_dispute(dispute: &NewDispute, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let evidence = serde_json::to_string(&dispute.evidence).unwrap_or_else(|_| "[]".to_string());
    sqlx::query_scalar::<_, i64>(
        r#"
            INSERT INTO disputes (order_id, opened_by, reason, description, evidence, status)
            VALUES ($1, $2, $3, $4, $5, 'open')
            RETURNING id
        "#,
    )
    .bind(dispute.order_id)
    .bind(&dispute.opened_by)
    .bind(dispute.reason)
    .bind(&dispute.description)
    .bind(evidence)
    .fetch_one(conn)
    .await
}

const DISPUTE_COLUMNS: &str = r#"
    SELECT id, order_id, opened_by, reason, description, evidence, status, resolution, resolution_note,
           seller_amount, resolved_by, opened_at, resolved_at
    FROM disputes
"#;

pub async fn fetch_dispute(dispute_id: i64, conn: &mut SqliteConnection) -> Result<Option<Dispute>, sqlx::Error> {
    sqlx::query_as::<_, Dispute>(&format!("{DISPUTE_COLUMNS} WHERE id = $1"))
        .bind(dispute_id)
        .fetch_optional(conn)
        .await
}

/// The most recent dispute on the order, whatever its status.
pub async fn fetch_latest_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Dispute>, sqlx::Error> {
    sqlx::query_as::<_, Dispute>(&format!("{DISPUTE_COLUMNS} WHERE order_id = $1 ORDER BY id DESC LIMIT 1"))
        .bind(order_id)
        .fetch_optional(conn)
        .await
}

pub async fn mark_resolved(
    dispute_id: i64,
    resolved_by: &ProfileId,
    resolution_label: &str,
    seller_amount: Option<MinorUnits>,
    note: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            UPDATE disputes
            SET status = 'resolved', resolution = $1, resolution_note = $2, seller_amount = $3,
                resolved_by = $4, resolved_at = CURRENT_TIMESTAMP
            WHERE id = $5
        "#,
    )
    .bind(resolution_label)
    .bind(note)
    .bind(seller_amount)
    .bind(resolved_by)
    .bind(dispute_id)
    .execute(conn)
    .await?;
    Ok(())
}
