use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{NewQuote, NewQuoteRequest, Quote, QuoteRequest};

pub async fn insert_quote_request(
    request: &NewQuoteRequest,
    conn: &mut SqliteConnection,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
            INSERT INTO quote_requests (client_id, category_id, title, description, location, budget, preferred_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
        "#,
    )
    .bind(&request.client_id)
    .bind(&request.category_id)
    .bind(&request.title)
    .bind(&request.description)
    .bind(&request.location)
    .bind(request.budget)
    .bind(&request.preferred_date)
    .fetch_one(conn)
    .await
}

const REQUEST_COLUMNS: &str = r#"
    SELECT id, client_id, category_id, title, description, location, budget, preferred_date, status, quote_count,
           created_at
    FROM quote_requests
"#;

pub async fn fetch_quote_request(
    request_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<QuoteRequest>, sqlx::Error> {
    sqlx::query_as::<_, QuoteRequest>(&format!("{REQUEST_COLUMNS} WHERE id = $1"))
        .bind(request_id)
        .fetch_optional(conn)
        .await
}

/// Inserts a quote with `pending` status. The `(quote_request_id, seller_id)` unique index is the
/// one-quote-per-bidder guard; a violation propagates as a database error for the caller to classify.
pub async fn insert_quote(quote: &NewQuote, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
            INSERT INTO quotes (quote_request_id, seller_id, amount, currency, description, estimated_days,
                                valid_until, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending')
            RETURNING id
        "#,
    )
    .bind(quote.quote_request_id)
    .bind(&quote.seller_id)
    .bind(quote.amount)
    .bind(&quote.currency)
    .bind(&quote.description)
    .bind(quote.estimated_days)
    .bind(quote.valid_until)
    .fetch_one(conn)
    .await
}

pub async fn incr_quote_count(request_id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE quote_requests SET quote_count = quote_count + 1 WHERE id = $1")
        .bind(request_id)
        .execute(conn)
        .await?;
    Ok(())
}

const QUOTE_COLUMNS: &str = r#"
    SELECT id, quote_request_id, seller_id, amount, currency, description, estimated_days, valid_until, status,
           created_at
    FROM quotes
"#;

pub async fn fetch_quote(quote_id: i64, conn: &mut SqliteConnection) -> Result<Option<Quote>, sqlx::Error> {
    sqlx::query_as::<_, Quote>(&format!("{QUOTE_COLUMNS} WHERE id = $1")).bind(quote_id).fetch_optional(conn).await
}

pub async fn fetch_quotes_for_request(
    request_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Quote>, sqlx::Error> {
    sqlx::query_as::<_, Quote>(&format!("{QUOTE_COLUMNS} WHERE quote_request_id = $1 ORDER BY id ASC"))
        .bind(request_id)
        .fetch_all(conn)
        .await
}

/// The three writes of accept-one-reject-rest. Callers wrap these in a transaction; partial application must be
/// impossible.
pub async fn mark_accepted(quote_id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE quotes SET status = 'accepted' WHERE id = $1").bind(quote_id).execute(conn).await?;
    Ok(())
}

pub async fn reject_other_quotes(
    request_id: i64,
    accepted_quote_id: i64,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("UPDATE quotes SET status = 'rejected' WHERE quote_request_id = $1 AND id != $2")
        .bind(request_id)
        .bind(accepted_quote_id)
        .execute(conn)
        .await?;
    trace!("🗃️ {} competing quotes rejected on request {request_id}", res.rows_affected());
    Ok(res.rows_affected())
}

pub async fn close_request(request_id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE quote_requests SET status = 'closed' WHERE id = $1").bind(request_id).execute(conn).await?;
    Ok(())
}
