//! Data types for the marketplace escrow engine.
//!
//! These are the records as they live in the database, plus the `New*` forms used for inserts. All status fields are
//! closed enums; label text for UI purposes is a presentation concern and lives outside this crate.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use mes_common::MinorUnits;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------     ProfileId       ---------------------------------------------------------
/// A marketplace profile identifier (a client or seller profile, not a raw account identity).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct ProfileId(pub String);

impl Display for ProfileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<S: Into<String>> From<S> for ProfileId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl ProfileId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------       Actor         ---------------------------------------------------------
/// An authenticated caller. Authentication itself happens upstream; the engine only cares about the profile id and
/// whether the caller holds the arbitrator role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: ProfileId,
    pub arbitrator: bool,
}

impl Actor {
    pub fn member<S: Into<String>>(id: S) -> Self {
        Self { id: ProfileId::from(id), arbitrator: false }
    }

    pub fn arbitrator<S: Into<String>>(id: S) -> Self {
        Self { id: ProfileId::from(id), arbitrator: true }
    }
}

//--------------------------------------    OrderNumber      ---------------------------------------------------------
/// The human-readable order reference, generated at creation and unique across all orders.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(pub String);

impl FromStr for OrderNumber {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------  OrderStatusType    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// The order exists but escrow has not been confirmed as held yet.
    Pending,
    /// Funds are held in escrow and the seller is working on the deliverable. Older clients still send this as
    /// `active`; it is accepted on input but always stored and serialized as `in_progress`.
    #[serde(alias = "active")]
    InProgress,
    /// The seller has delivered and is waiting on the client.
    Delivered,
    /// The client has asked for rework; goes back to `Delivered` on redelivery.
    RevisionRequested,
    /// Terminal happy path. Escrow released to the seller.
    Completed,
    /// Terminal. Escrow refunded to the client.
    Cancelled,
    /// A dispute is live against the order. Only a dispute resolution moves the order out of this state.
    Disputed,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatusType::Pending => "pending",
            OrderStatusType::InProgress => "in_progress",
            OrderStatusType::Delivered => "delivered",
            OrderStatusType::RevisionRequested => "revision_requested",
            OrderStatusType::Completed => "completed",
            OrderStatusType::Cancelled => "cancelled",
            OrderStatusType::Disputed => "disputed",
        };
        f.write_str(s)
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" | "active" => Ok(Self::InProgress),
            "delivered" => Ok(Self::Delivered),
            "revision_requested" => Ok(Self::RevisionRequested),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "disputed" => Ok(Self::Disputed),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Completed | OrderStatusType::Cancelled)
    }

    /// Statuses from which a dispute may be opened.
    pub fn is_disputable(&self) -> bool {
        matches!(self, OrderStatusType::InProgress | OrderStatusType::Delivered)
    }
}

//--------------------------------------    EscrowStatus     ---------------------------------------------------------
/// The escrow axis is independent of the order status, but monotonic: once funds leave `Held` they never return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    Held,
    Released,
    Refunded,
}

impl Display for EscrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EscrowStatus::Held => "held",
            EscrowStatus::Released => "released",
            EscrowStatus::Refunded => "refunded",
        };
        f.write_str(s)
    }
}

//--------------------------------------       Order         ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: i64,
    pub order_number: OrderNumber,
    pub client_id: ProfileId,
    pub seller_id: ProfileId,
    pub amount: MinorUnits,
    pub currency: String,
    pub platform_fee: MinorUnits,
    pub seller_earnings: MinorUnits,
    pub external_payment_ref: String,
    pub status: OrderStatusType,
    pub escrow_status: EscrowStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn is_party(&self, actor: &Actor) -> bool {
        self.client_id == actor.id || self.seller_id == actor.id
    }

    /// The counterparty of `actor` on this order, if the actor is a party at all.
    pub fn counterparty(&self, actor: &Actor) -> Option<&ProfileId> {
        if self.client_id == actor.id {
            Some(&self.seller_id)
        } else if self.seller_id == actor.id {
            Some(&self.client_id)
        } else {
            None
        }
    }
}

//--------------------------------------      NewOrder       ---------------------------------------------------------
/// Order parameters as extracted from a verified `payment_captured` event. `seller_earnings` is not part of this
/// struct on purpose: the engine computes it, callers never supply it.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub client_id: ProfileId,
    pub seller_id: ProfileId,
    pub amount: MinorUnits,
    pub currency: String,
    pub platform_fee: MinorUnits,
    /// The payment processor's unique id for the captured payment. Idempotency key.
    pub external_payment_ref: String,
}

//--------------------------------------  TransactionType    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Payment,
    Payout,
    Refund,
    Fee,
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransactionType::Payment => "payment",
            TransactionType::Payout => "payout",
            TransactionType::Refund => "refund",
            TransactionType::Fee => "fee",
        };
        f.write_str(s)
    }
}

//--------------------------------------     Transaction     ---------------------------------------------------------
/// An immutable ledger line. Rows are only ever inserted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Transaction {
    pub id: i64,
    pub order_id: i64,
    pub txn_type: TransactionType,
    pub amount: MinorUnits,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------    DisputeStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Open,
    UnderReview,
    Resolved,
}

impl DisputeStatus {
    /// Active disputes block new disputes on the same order and are the only ones that can be resolved.
    pub fn is_active(&self) -> bool {
        matches!(self, DisputeStatus::Open | DisputeStatus::UnderReview)
    }
}

impl Display for DisputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DisputeStatus::Open => "open",
            DisputeStatus::UnderReview => "under_review",
            DisputeStatus::Resolved => "resolved",
        };
        f.write_str(s)
    }
}

//--------------------------------------    DisputeReason    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DisputeReason {
    NotDelivered,
    PoorQuality,
    NotAsDescribed,
    Communication,
    Other,
}

//--------------------------------------  DisputeResolution  ---------------------------------------------------------
/// The arbitrator's ruling. `PartialRefund` carries the seller's share explicitly; the engine never invents a split
/// ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "resolution")]
pub enum DisputeResolution {
    FullRefund,
    /// `seller_amount` is the portion of the seller's earnings to release; the remainder of the earnings is refunded
    /// to the client. Must satisfy `0 <= seller_amount <= seller_earnings`.
    PartialRefund { seller_amount: MinorUnits },
    ReleaseToSeller,
    MutualCancellation,
}

impl DisputeResolution {
    /// The label stored in the `resolution` column.
    pub fn as_label(&self) -> &'static str {
        match self {
            DisputeResolution::FullRefund => "full_refund",
            DisputeResolution::PartialRefund { .. } => "partial_refund",
            DisputeResolution::ReleaseToSeller => "release_to_seller",
            DisputeResolution::MutualCancellation => "mutual_cancellation",
        }
    }
}

//--------------------------------------     Evidence        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Text,
    Url,
}

/// A single piece of dispute evidence. `content` must be non-empty after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    #[serde(rename = "type")]
    pub kind: EvidenceKind,
    pub content: String,
}

//--------------------------------------      Dispute        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Dispute {
    pub id: i64,
    pub order_id: i64,
    pub opened_by: ProfileId,
    pub reason: DisputeReason,
    pub description: String,
    pub evidence: Json<Vec<EvidenceItem>>,
    pub status: DisputeStatus,
    pub resolution: Option<String>,
    pub resolution_note: Option<String>,
    pub seller_amount: Option<MinorUnits>,
    pub resolved_by: Option<ProfileId>,
    pub opened_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

//--------------------------------------     NewDispute      ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewDispute {
    pub order_id: i64,
    pub opened_by: ProfileId,
    pub reason: DisputeReason,
    pub description: String,
    pub evidence: Vec<EvidenceItem>,
}

//-------------------------------------- QuoteRequestStatus  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuoteRequestStatus {
    Open,
    Closed,
}

//--------------------------------------    QuoteRequest     ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuoteRequest {
    pub id: i64,
    pub client_id: ProfileId,
    pub category_id: String,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub budget: Option<MinorUnits>,
    pub preferred_date: Option<String>,
    pub status: QuoteRequestStatus,
    /// Denormalized count of quotes on the request, incremented in the same transaction as each quote insert.
    pub quote_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewQuoteRequest {
    pub client_id: ProfileId,
    pub category_id: String,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub budget: Option<MinorUnits>,
    pub preferred_date: Option<String>,
}

//--------------------------------------     QuoteStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Pending,
    Accepted,
    Rejected,
}

//--------------------------------------       Quote         ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Quote {
    pub id: i64,
    pub quote_request_id: i64,
    pub seller_id: ProfileId,
    pub amount: MinorUnits,
    pub currency: String,
    pub description: String,
    pub estimated_days: Option<i64>,
    pub valid_until: Option<DateTime<Utc>>,
    pub status: QuoteStatus,
    pub created_at: DateTime<Utc>,
}

impl Quote {
    /// `valid_until` is advisory. Nothing expires quotes in the background, but acceptance checks this.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.map(|t| t < now).unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub struct NewQuote {
    pub quote_request_id: i64,
    pub seller_id: ProfileId,
    pub amount: MinorUnits,
    pub currency: String,
    pub description: String,
    pub estimated_days: Option<i64>,
    pub valid_until: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod test {
    use super::OrderStatusType;

    #[test]
    fn legacy_active_status_is_read_as_in_progress() {
        let from_json: OrderStatusType = serde_json::from_str("\"active\"").unwrap();
        assert_eq!(from_json, OrderStatusType::InProgress);
        assert_eq!("active".parse::<OrderStatusType>().unwrap(), OrderStatusType::InProgress);
        // Output is canonical only.
        assert_eq!(serde_json::to_string(&OrderStatusType::InProgress).unwrap(), "\"in_progress\"");
    }
}
