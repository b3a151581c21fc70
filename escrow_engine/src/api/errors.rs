use thiserror::Error;

use crate::{db::traits::StoreError, db_types::OrderStatusType};

#[derive(Debug, Error)]
pub enum OrderFlowError {
    /// The platform fee exceeded the gross amount. This is a misconfigured fee schedule, not a user error, and is
    /// never swallowed.
    #[error("Fatal configuration error: {0}")]
    ConfigurationError(String),
    #[error("Cannot move an order from {from} to {to}")]
    InvalidTransition { from: OrderStatusType, to: OrderStatusType },
    #[error("Order #{0} not found")]
    OrderNotFound(String),
    #[error("You are not a party on this order")]
    Forbidden,
    #[error("{0}")]
    InvalidState(String),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for OrderFlowError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::OrderNotFound(order) => OrderFlowError::OrderNotFound(order),
            StoreError::EscrowSettled { order, status } => {
                OrderFlowError::InvalidState(format!("Escrow for order #{order} is already {status}"))
            },
            StoreError::StaleOrderStatus { order, expected } => {
                OrderFlowError::InvalidState(format!("Order #{order} is no longer {expected}"))
            },
            other => OrderFlowError::Store(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum DisputeApiError {
    #[error("Order #{0} not found")]
    OrderNotFound(String),
    #[error("Dispute {0} not found")]
    DisputeNotFound(i64),
    #[error("Only a party on the order may do this")]
    Forbidden,
    #[error("Only an arbitrator may resolve disputes")]
    ArbitratorRequired,
    #[error("A dispute is already open for this order")]
    AlreadyDisputed,
    #[error("{0}")]
    InvalidState(String),
    #[error("Invalid dispute submission: {0}")]
    InvalidSubmission(String),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for DisputeApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ActiveDisputeExists => DisputeApiError::AlreadyDisputed,
            StoreError::OrderNotFound(order) => DisputeApiError::OrderNotFound(order),
            StoreError::DisputeNotFound(id) => DisputeApiError::DisputeNotFound(id),
            StoreError::DisputeNotActive(id) => {
                DisputeApiError::InvalidState(format!("Dispute {id} has already been resolved"))
            },
            StoreError::EscrowSettled { order, status } => {
                DisputeApiError::InvalidState(format!("Escrow for order #{order} is already {status}"))
            },
            StoreError::OrderNotDisputable { order, status } => {
                DisputeApiError::InvalidState(format!("A dispute cannot be opened on order #{order} while it is {status}"))
            },
            StoreError::StaleOrderStatus { order, expected } => {
                DisputeApiError::InvalidState(format!("Order #{order} is no longer {expected}"))
            },
            other => DisputeApiError::Store(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum QuoteApiError {
    #[error("Quote request {0} not found")]
    RequestNotFound(i64),
    #[error("Quote {0} not found")]
    QuoteNotFound(i64),
    #[error("Only the request's client may do this")]
    Forbidden,
    #[error("You have already submitted a quote for this request")]
    DuplicateQuote,
    #[error("{0}")]
    InvalidState(String),
    #[error("Invalid quote submission: {0}")]
    InvalidSubmission(String),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for QuoteApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateQuote => QuoteApiError::DuplicateQuote,
            StoreError::QuoteRequestNotFound(id) => QuoteApiError::RequestNotFound(id),
            StoreError::QuoteNotFound(id) => QuoteApiError::QuoteNotFound(id),
            StoreError::QuoteRequestClosed(id) => {
                QuoteApiError::InvalidState(format!("Quote request {id} is closed to new quotes"))
            },
            StoreError::QuoteNotPending { quote, status } => {
                QuoteApiError::InvalidState(format!("Quote {quote} is {status}, not pending"))
            },
            other => QuoteApiError::Store(other),
        }
    }
}
