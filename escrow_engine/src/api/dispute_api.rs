use std::{fmt::Debug, sync::Arc};

use log::*;
use serde_json::json;

use crate::{
    api::errors::DisputeApiError,
    db_types::{Actor, Dispute, DisputeReason, DisputeResolution, EvidenceItem, NewDispute, Order, OrderNumber},
    notifications::{dispatch_all, Notification, NotificationDispatcher, NotificationType},
    MarketplaceDatabase,
};

/// `DisputeApi` opens, reads and resolves disputes against orders, and owns the order-status edges into and out of
/// `disputed`.
pub struct DisputeApi<B> {
    db: B,
    notifier: Arc<dyn NotificationDispatcher>,
}

impl<B> Debug for DisputeApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DisputeApi")
    }
}

impl<B> DisputeApi<B> {
    pub fn new(db: B, notifier: Arc<dyn NotificationDispatcher>) -> Self {
        Self { db, notifier }
    }
}

fn validate_submission(description: &str, evidence: &[EvidenceItem]) -> Result<(), DisputeApiError> {
    if description.trim().is_empty() {
        return Err(DisputeApiError::InvalidSubmission("Description must not be empty".to_string()));
    }
    if evidence.iter().any(|item| item.content.trim().is_empty()) {
        return Err(DisputeApiError::InvalidSubmission("Evidence items must not be empty".to_string()));
    }
    Ok(())
}

impl<B> DisputeApi<B>
where B: MarketplaceDatabase
{
    /// Opens a dispute on behalf of `actor`, who must be the client or the seller on the order.
    ///
    /// The order must be `in_progress` or `delivered`. The check here gives a precise early error; the store
    /// repeats it inside its transaction, so an order settled concurrently cannot end up disputed. The
    /// single-active-dispute rule is enforced by the store's uniqueness guard, so two concurrent calls cannot both
    /// succeed; the loser gets `AlreadyDisputed`. On success
    /// the order moves to `disputed` in the same transaction as the dispute insert, and the counterparty is
    /// notified.
    pub async fn open(
        &self,
        order_number: &OrderNumber,
        actor: &Actor,
        reason: DisputeReason,
        description: String,
        evidence: Vec<EvidenceItem>,
    ) -> Result<Dispute, DisputeApiError> {
        validate_submission(&description, &evidence)?;
        let order = self.order_for_party(order_number, actor).await?;
        if !order.status.is_disputable() {
            return Err(DisputeApiError::InvalidState(format!(
                "A dispute cannot be opened on a {} order",
                order.status
            )));
        }
        let dispute = NewDispute { order_id: order.id, opened_by: actor.id.clone(), reason, description, evidence };
        let stored = self.db.open_dispute(dispute).await?;
        info!("⚖️ Dispute {} opened on order {} by {}", stored.id, order.order_number, actor.id);
        if let Some(counterparty) = order.counterparty(actor) {
            let note = Notification::new(
                counterparty.clone(),
                NotificationType::DisputeOpened,
                "Dispute opened",
                format!("A dispute has been opened on order {}.", order.order_number),
            )
            .with_metadata(json!({ "order_number": order.order_number, "dispute_id": stored.id }));
            dispatch_all(&self.notifier, vec![note]).await;
        }
        Ok(stored)
    }

    /// The most recent dispute on the order, or `None`. Readable by the order's parties and by arbitrators.
    pub async fn get(&self, order_number: &OrderNumber, actor: &Actor) -> Result<Option<Dispute>, DisputeApiError> {
        let order = self.order_for_party(order_number, actor).await?;
        Ok(self.db.fetch_latest_dispute_for_order(order.id).await?)
    }

    /// Applies an arbitrator's ruling. The dispute must still be active (`open` or `under_review`).
    ///
    /// * `full_refund` / `mutual_cancellation`: order `cancelled`, escrow `refunded`, one `refund` line for the
    ///   gross amount.
    /// * `release_to_seller`: order `completed`, escrow `released`, `payout` + `fee` lines.
    /// * `partial_refund { seller_amount }`: order `completed`, escrow `released`; `seller_amount` of the seller's
    ///   earnings is paid out, the remainder refunded to the client; the platform fee is retained. The split is
    ///   supplied by the arbitrator, never invented here.
    pub async fn resolve(
        &self,
        dispute_id: i64,
        actor: &Actor,
        resolution: DisputeResolution,
        note: Option<String>,
    ) -> Result<(Dispute, Order), DisputeApiError> {
        if !actor.arbitrator {
            return Err(DisputeApiError::ArbitratorRequired);
        }
        let dispute =
            self.db.fetch_dispute(dispute_id).await?.ok_or(DisputeApiError::DisputeNotFound(dispute_id))?;
        if !dispute.status.is_active() {
            return Err(DisputeApiError::InvalidState(format!(
                "Dispute {dispute_id} has already been resolved"
            )));
        }
        if let DisputeResolution::PartialRefund { seller_amount } = resolution {
            let order = self
                .db
                .fetch_order_by_id(dispute.order_id)
                .await?
                .ok_or_else(|| DisputeApiError::OrderNotFound(dispute.order_id.to_string()))?;
            if seller_amount.is_negative() || seller_amount > order.seller_earnings {
                return Err(DisputeApiError::InvalidState(format!(
                    "Partial refund seller amount {} must be between 0 and the seller earnings {}",
                    seller_amount, order.seller_earnings
                )));
            }
        }
        let (resolved, order) = self.db.resolve_dispute(dispute_id, &actor.id, resolution, note).await?;
        info!(
            "⚖️ Dispute {dispute_id} resolved as {} by {}. Order {} is {} / escrow {}",
            resolution.as_label(),
            actor.id,
            order.order_number,
            order.status,
            order.escrow_status
        );
        self.notify_resolution(&resolved, &order).await;
        Ok((resolved, order))
    }

    async fn order_for_party(&self, order_number: &OrderNumber, actor: &Actor) -> Result<Order, DisputeApiError> {
        let order = self
            .db
            .fetch_order_by_number(order_number)
            .await?
            .ok_or_else(|| DisputeApiError::OrderNotFound(order_number.as_str().to_string()))?;
        if !order.is_party(actor) && !actor.arbitrator {
            return Err(DisputeApiError::Forbidden);
        }
        Ok(order)
    }

    async fn notify_resolution(&self, dispute: &Dispute, order: &Order) {
        let resolution = dispute.resolution.clone().unwrap_or_default();
        let metadata = json!({
            "order_number": order.order_number,
            "dispute_id": dispute.id,
            "resolution": resolution,
        });
        let notes = [&order.client_id, &order.seller_id]
            .into_iter()
            .map(|party| {
                Notification::new(
                    party.clone(),
                    NotificationType::DisputeResolved,
                    "Dispute resolved",
                    format!("The dispute on order {} was resolved: {resolution}.", order.order_number),
                )
                .with_metadata(metadata.clone())
            })
            .collect();
        dispatch_all(&self.notifier, notes).await;
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
