//! # SQLite backend
//!
//! Low-level database interactions live in per-table modules of plain functions that accept a
//! `&mut SqliteConnection`. Callers obtain a connection from the pool, or open a transaction and pass `&mut *tx`,
//! so any group of calls can be made atomic without the functions changing. [`SqliteDatabase`] composes them into
//! the transactional units of the [`MarketplaceDatabase`](crate::MarketplaceDatabase) trait.
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

mod db;
pub(crate) mod disputes;
pub(crate) mod errors;
pub(crate) mod orders;
pub(crate) mod quotes;
pub(crate) mod transactions;

pub use db::SqliteDatabase;

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
