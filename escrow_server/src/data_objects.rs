use std::fmt::Display;

use chrono::{DateTime, Utc};
use escrow_engine::db_types::{
    Actor,
    DisputeReason,
    DisputeResolution,
    EvidenceItem,
    NewQuote,
    NewQuoteRequest,
    OrderStatusType,
    ProfileId,
};
use mes_common::MinorUnits;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatusType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenDisputeRequest {
    pub reason: DisputeReason,
    pub description: String,
    #[serde(default)]
    pub evidence: Vec<EvidenceItem>,
}

/// The `resolution` tag and its optional `seller_amount` deserialize straight into [`DisputeResolution`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveDisputeRequest {
    #[serde(flatten)]
    pub resolution: DisputeResolution,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequestParams {
    pub category_id: String,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub budget: Option<MinorUnits>,
    pub preferred_date: Option<String>,
}

impl QuoteRequestParams {
    /// The client id comes from the authenticated identity, never from the payload.
    pub fn into_new_request(self, actor: &Actor) -> NewQuoteRequest {
        NewQuoteRequest {
            client_id: actor.id.clone(),
            category_id: self.category_id,
            title: self.title,
            description: self.description,
            location: self.location,
            budget: self.budget,
            preferred_date: self.preferred_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteParams {
    pub amount: MinorUnits,
    pub currency: String,
    pub description: String,
    pub estimated_days: Option<i64>,
    pub valid_until: Option<DateTime<Utc>>,
}

impl QuoteParams {
    pub fn into_new_quote(self, request_id: i64) -> NewQuote {
        NewQuote {
            quote_request_id: request_id,
            seller_id: ProfileId::from(""),
            amount: self.amount,
            currency: self.currency,
            description: self.description,
            estimated_days: self.estimated_days,
            valid_until: self.valid_until,
        }
    }
}
