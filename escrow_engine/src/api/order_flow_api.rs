use std::{fmt::Debug, sync::Arc};

use log::*;
use serde_json::json;

use crate::{
    api::errors::OrderFlowError,
    db::common::InsertOrderResult,
    db_types::{Actor, NewOrder, Order, OrderNumber, OrderStatusType, ProfileId, Transaction},
    notifications::{dispatch_all, Notification, NotificationDispatcher, NotificationType},
    MarketplaceDatabase,
};

/// `OrderFlowApi` owns the order state machine and the escrow sub-state: creating orders from captured payments,
/// walking the status graph on behalf of the order's parties, and cancelling with refund.
///
/// Moves in and out of `disputed` are deliberately absent here; those edges belong to
/// [`DisputeApi`](crate::DisputeApi).
pub struct OrderFlowApi<B> {
    db: B,
    notifier: Arc<dyn NotificationDispatcher>,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, notifier: Arc<dyn NotificationDispatcher>) -> Self {
        Self { db, notifier }
    }
}

/// The closed transition graph for actor-initiated moves. Everything else is illegal.
fn transition_allowed(from: OrderStatusType, to: OrderStatusType) -> bool {
    use OrderStatusType::*;
    matches!(
        (from, to),
        (Pending, InProgress) |
            (InProgress, Delivered) |
            (Delivered, Completed) |
            (Delivered, RevisionRequested) |
            (RevisionRequested, Delivered)
    )
}

impl<B> OrderFlowApi<B>
where B: MarketplaceDatabase
{
    /// Handles a verified `payment_captured` event.
    ///
    /// Computes the seller's earnings (`amount − platform_fee`; a negative result is a fatal configuration error),
    /// then delegates to the store's idempotent insert: replaying the same payment reference any number of times
    /// creates exactly one order and one `payment` ledger line. Both parties are notified only on first delivery.
    pub async fn process_captured_payment(&self, order: NewOrder) -> Result<InsertOrderResult, OrderFlowError> {
        if order.amount.value() <= 0 {
            return Err(OrderFlowError::InvalidState(format!(
                "Gross amount must be positive, got {}",
                order.amount
            )));
        }
        if order.platform_fee.is_negative() || order.platform_fee > order.amount {
            return Err(OrderFlowError::ConfigurationError(format!(
                "Platform fee {} is outside [0, {}] for payment ref {}",
                order.platform_fee, order.amount, order.external_payment_ref
            )));
        }
        let result = self.db.create_order(order).await?;
        if result.is_new() {
            let order = result.order();
            info!("🔄️📦️ Order {} created from payment ref {}", order.order_number, order.external_payment_ref);
            self.notify_order_created(order).await;
        } else {
            info!(
                "🔄️📦️ Duplicate payment event for ref {}. No side effects.",
                result.order().external_payment_ref
            );
        }
        Ok(result)
    }

    /// Best-effort heads-up to the buyer that their payment did not capture. No order is created.
    pub async fn notify_payment_failed(&self, client_id: ProfileId, reason: Option<String>) {
        let body = match reason {
            Some(r) => format!("Your payment could not be processed: {r}"),
            None => "Your payment could not be processed.".to_string(),
        };
        let note = Notification::new(client_id, NotificationType::PaymentFailed, "Payment failed", body);
        dispatch_all(&self.notifier, vec![note]).await;
    }

    /// Walks one edge of the status graph on behalf of `actor`, who must be a party on the order.
    ///
    /// Entering `completed` settles escrow: `completed_at` is stamped, escrow moves to `released`, and `payout`/
    /// `fee` ledger lines are appended, all in the same transaction as the status write.
    pub async fn transition(
        &self,
        order_number: &OrderNumber,
        target: OrderStatusType,
        actor: &Actor,
    ) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(order_number, actor).await?;
        if !transition_allowed(order.status, target) {
            debug!("🔄️📦️ Refusing {} -> {target} on order {order_number}", order.status);
            return Err(OrderFlowError::InvalidTransition { from: order.status, to: target });
        }
        let updated = if target == OrderStatusType::Completed {
            self.db.complete_order(order.id).await?
        } else {
            self.db.update_order_status(order.id, order.status, target).await?
        };
        info!("🔄️📦️ Order {order_number} moved from {} to {}", order.status, updated.status);
        self.notify_status_change(&updated, actor).await;
        Ok(updated)
    }

    /// Mutual cancellation. Only legal while the order is `pending` or `in_progress`; refunds the full gross
    /// amount held in escrow.
    pub async fn cancel(&self, order_number: &OrderNumber, actor: &Actor) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(order_number, actor).await?;
        if !matches!(order.status, OrderStatusType::Pending | OrderStatusType::InProgress) {
            return Err(OrderFlowError::InvalidTransition { from: order.status, to: OrderStatusType::Cancelled });
        }
        let updated = self.db.cancel_order(order.id).await?;
        info!("🔄️📦️ Order {order_number} cancelled by {}", actor.id);
        if let Some(counterparty) = updated.counterparty(actor) {
            let note = Notification::new(
                counterparty.clone(),
                NotificationType::OrderCancelled,
                "Order cancelled",
                format!("Order {} was cancelled and the payment refunded.", updated.order_number),
            )
            .with_metadata(json!({ "order_number": updated.order_number }));
            dispatch_all(&self.notifier, vec![note]).await;
        }
        Ok(updated)
    }

    /// Party-gated order view.
    pub async fn fetch_order(&self, order_number: &OrderNumber, actor: &Actor) -> Result<Order, OrderFlowError> {
        let order = self
            .db
            .fetch_order_by_number(order_number)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_number.as_str().to_string()))?;
        if !order.is_party(actor) && !actor.arbitrator {
            return Err(OrderFlowError::Forbidden);
        }
        Ok(order)
    }

    /// The append-only ledger lines for an order, party-gated like the order itself.
    pub async fn fetch_ledger(
        &self,
        order_number: &OrderNumber,
        actor: &Actor,
    ) -> Result<Vec<Transaction>, OrderFlowError> {
        let order = self.fetch_order(order_number, actor).await?;
        Ok(self.db.fetch_transactions_for_order(order.id).await?)
    }

    async fn notify_order_created(&self, order: &Order) {
        let metadata = json!({ "order_number": order.order_number, "amount": order.amount });
        let notes = vec![
            Notification::new(
                order.client_id.clone(),
                NotificationType::OrderCreated,
                "Payment received",
                format!("Your payment for order {} was received and is held in escrow.", order.order_number),
            )
            .with_metadata(metadata.clone()),
            Notification::new(
                order.seller_id.clone(),
                NotificationType::OrderCreated,
                "New order",
                format!("You have a new order {}. Funds are held in escrow until completion.", order.order_number),
            )
            .with_metadata(metadata),
        ];
        dispatch_all(&self.notifier, notes).await;
    }

    async fn notify_status_change(&self, order: &Order, actor: &Actor) {
        let Some(counterparty) = order.counterparty(actor) else {
            return;
        };
        let note = Notification::new(
            counterparty.clone(),
            NotificationType::OrderStatusChanged,
            "Order updated",
            format!("Order {} is now {}.", order.order_number, order.status),
        )
        .with_metadata(json!({ "order_number": order.order_number, "status": order.status }));
        dispatch_all(&self.notifier, vec![note]).await;
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

#[cfg(test)]
mod test {
    use super::transition_allowed;
    use crate::db_types::OrderStatusType::*;

    #[test]
    fn legal_edges() {
        assert!(transition_allowed(Pending, InProgress));
        assert!(transition_allowed(InProgress, Delivered));
        assert!(transition_allowed(Delivered, Completed));
        assert!(transition_allowed(Delivered, RevisionRequested));
        assert!(transition_allowed(RevisionRequested, Delivered));
    }

    #[test]
    fn illegal_edges() {
        // Terminal states are sticky.
        for s in [Completed, Cancelled] {
            for t in [Pending, InProgress, Delivered, RevisionRequested, Completed, Cancelled, Disputed] {
                assert!(!transition_allowed(s, t), "{s} -> {t} should be illegal");
            }
        }
        // Dispute edges are reserved for the dispute manager.
        for s in [Pending, InProgress, Delivered, RevisionRequested] {
            assert!(!transition_allowed(s, Disputed));
        }
        for t in [Pending, InProgress, Delivered, RevisionRequested, Completed, Cancelled] {
            assert!(!transition_allowed(Disputed, t));
        }
        // No skipping ahead.
        assert!(!transition_allowed(Pending, Delivered));
        assert!(!transition_allowed(InProgress, Completed));
        assert!(!transition_allowed(RevisionRequested, Completed));
    }
}
