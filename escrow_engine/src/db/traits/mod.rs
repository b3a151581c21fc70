mod marketplace_database;

use thiserror::Error;

pub use marketplace_database::MarketplaceDatabase;

use crate::db_types::{EscrowStatus, OrderStatusType};

/// Errors surfaced by backends implementing [`MarketplaceDatabase`].
///
/// Conflict variants (`ActiveDisputeExists`, `DuplicateQuote`) are produced when an insert loses a race against a
/// uniqueness constraint; precondition variants describe a record found in a state the operation does not permit.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Order #{0} not found")]
    OrderNotFound(String),
    #[error("A dispute is already open for this order")]
    ActiveDisputeExists,
    #[error("Dispute {0} not found")]
    DisputeNotFound(i64),
    #[error("Dispute {0} has already been resolved")]
    DisputeNotActive(i64),
    #[error("Escrow for order #{order} is already {status}")]
    EscrowSettled { order: String, status: EscrowStatus },
    #[error("Order #{order} is no longer {expected}")]
    StaleOrderStatus { order: String, expected: OrderStatusType },
    #[error("Order #{order} is {status} and cannot be disputed")]
    OrderNotDisputable { order: String, status: OrderStatusType },
    #[error("Quote request {0} not found")]
    QuoteRequestNotFound(i64),
    #[error("Quote request {0} is closed to new quotes")]
    QuoteRequestClosed(i64),
    #[error("You have already submitted a quote for this request")]
    DuplicateQuote,
    #[error("Quote {0} not found")]
    QuoteNotFound(i64),
    #[error("Quote {quote} is {status}, not pending")]
    QuoteNotPending { quote: i64, status: String },
    #[error("Could not allocate a unique order number")]
    OrderNumberExhausted,
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}
