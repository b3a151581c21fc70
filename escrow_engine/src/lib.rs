//! Marketplace Escrow Engine
//!
//! Core logic for the order/escrow lifecycle of the marketplace: turning captured payments into tracked orders,
//! holding funds in escrow, running the dispute workflow, and the competitive quote negotiation that can precede an
//! order. The library is provider-agnostic: backends implement the [`MarketplaceDatabase`] trait, and the public
//! APIs ([`OrderFlowApi`], [`DisputeApi`], [`QuoteApi`]) drive every state change through it.
//!
//! All cross-request coordination is delegated to the store's transactional guarantees. The engine keeps no mutable
//! state between calls; the uniqueness constraints in the schema are the race-safety mechanism for payment-event
//! idempotency, single-active-dispute and one-quote-per-bidder.
mod api;
mod db;

pub mod db_types;
pub mod helpers;
pub mod notifications;

pub use api::{
    dispute_api::DisputeApi,
    errors::{DisputeApiError, OrderFlowError, QuoteApiError},
    order_flow_api::OrderFlowApi,
    quote_api::QuoteApi,
};
pub use db::{
    common::InsertOrderResult,
    sqlite::SqliteDatabase,
    traits::{MarketplaceDatabase, StoreError},
};
