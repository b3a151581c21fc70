//! # Marketplace escrow server
//! The HTTP boundary of the marketplace escrow engine. It is responsible for:
//! Listening for incoming webhook events from the payment processor.
//! Verifying the HMAC signature on each webhook delivery before it reaches a handler.
//! Exposing the order, dispute and quote operations to authenticated marketplace users.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/webhook/payment`: The webhook route for receiving payment events from the payment processor.
//! * `/api/...`: The authenticated order, dispute and quote endpoints.

pub mod auth;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod middleware;
pub mod payment_events;
pub mod routes;
pub mod server;
pub mod webhook_routes;

#[cfg(test)]
mod endpoint_tests;
