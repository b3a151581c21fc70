use crate::{
    db::{common::InsertOrderResult, traits::StoreError},
    db_types::{
        Dispute,
        DisputeResolution,
        NewDispute,
        NewOrder,
        NewQuote,
        NewQuoteRequest,
        Order,
        OrderNumber,
        OrderStatusType,
        ProfileId,
        Quote,
        QuoteRequest,
        Transaction,
    },
};

/// The transactional units the escrow engine requires from a backing store.
///
/// Every method is a single atomic unit of work: either all of its writes commit, or none do. Methods that insert
/// against a uniqueness constraint (`create_order`, `open_dispute`, `submit_quote`) must resolve races at the
/// constraint, never by reading first, and report the losing side as a typed conflict.
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase: Clone {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Stores the order for a captured payment, idempotently keyed on `external_payment_ref`.
    ///
    /// On first delivery, atomically: assigns a fresh order number, persists the order as `in_progress` with escrow
    /// `held`, and appends the `payment` ledger line for the gross amount. On a duplicate delivery the existing
    /// order is returned unchanged and no rows are written.
    async fn create_order(&self, order: NewOrder) -> Result<InsertOrderResult, StoreError>;

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, StoreError>;

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, StoreError>;

    async fn fetch_order_by_payment_ref(&self, external_ref: &str) -> Result<Option<Order>, StoreError>;

    /// Writes a new status for the order, conditional on the current status still being `expected`. This is the
    /// edge-walk write used for the non-terminal transitions; legality of the edge is the caller's responsibility,
    /// but a concurrent writer changing the status first must fail the write with
    /// [`StoreError::StaleOrderStatus`], never overwrite it.
    async fn update_order_status(
        &self,
        order_id: i64,
        expected: OrderStatusType,
        status: OrderStatusType,
    ) -> Result<Order, StoreError>;

    /// Completes the order: status `completed`, `completed_at` set, escrow `held -> released`, plus a `payout`
    /// ledger line for the seller's earnings and a `fee` line for the platform fee. Fails with
    /// [`StoreError::EscrowSettled`] if escrow already left `held`.
    async fn complete_order(&self, order_id: i64) -> Result<Order, StoreError>;

    /// Cancels the order: status `cancelled`, escrow `held -> refunded`, plus a `refund` ledger line for the full
    /// gross amount (the platform waives its fee on refunds).
    async fn cancel_order(&self, order_id: i64) -> Result<Order, StoreError>;

    /// Ledger lines for the order, oldest first.
    async fn fetch_transactions_for_order(&self, order_id: i64) -> Result<Vec<Transaction>, StoreError>;

    /// Inserts the dispute and moves the order to `disputed` in one transaction. The order must still be in a
    /// disputable status when the transaction runs ([`StoreError::OrderNotDisputable`] otherwise, even if a caller
    /// checked earlier). A second active dispute on the same order loses the race on the partial unique index and
    /// returns [`StoreError::ActiveDisputeExists`].
    async fn open_dispute(&self, dispute: NewDispute) -> Result<Dispute, StoreError>;

    async fn fetch_dispute(&self, dispute_id: i64) -> Result<Option<Dispute>, StoreError>;

    /// The most recent dispute on the order, resolved or not.
    async fn fetch_latest_dispute_for_order(&self, order_id: i64) -> Result<Option<Dispute>, StoreError>;

    /// Applies an arbitrator's ruling in one transaction: the dispute becomes `resolved`, and the order, escrow and
    /// ledger are updated according to the resolution. Returns the resolved dispute and the updated order.
    async fn resolve_dispute(
        &self,
        dispute_id: i64,
        resolved_by: &ProfileId,
        resolution: DisputeResolution,
        note: Option<String>,
    ) -> Result<(Dispute, Order), StoreError>;

    async fn create_quote_request(&self, request: NewQuoteRequest) -> Result<QuoteRequest, StoreError>;

    async fn fetch_quote_request(&self, request_id: i64) -> Result<Option<QuoteRequest>, StoreError>;

    /// Inserts the quote and increments the request's `quote_count` in one transaction. A second quote from the
    /// same seller loses the race on the `(quote_request_id, seller_id)` index and returns
    /// [`StoreError::DuplicateQuote`]; a closed request returns [`StoreError::QuoteRequestClosed`].
    async fn submit_quote(&self, quote: NewQuote) -> Result<Quote, StoreError>;

    async fn fetch_quote(&self, quote_id: i64) -> Result<Option<Quote>, StoreError>;

    /// Quotes on the request, oldest first.
    async fn fetch_quotes_for_request(&self, request_id: i64) -> Result<Vec<Quote>, StoreError>;

    /// Accept-one-reject-rest in a single transaction: the quote becomes `accepted`, every other quote on the same
    /// request becomes `rejected`, and the request is `closed`. Preconditions (quote `pending`, request `open`) are
    /// re-checked inside the transaction. Returns the accepted quote and the closed request.
    async fn accept_quote(&self, quote_id: i64) -> Result<(Quote, QuoteRequest), StoreError>;
}
