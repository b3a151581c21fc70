//! `SqliteDatabase` is a concrete implementation of the marketplace escrow backend.
//!
//! Each trait method is one transactional unit: a `begin`/`commit` pair around the low-level per-table functions.
//! Uniqueness races (duplicate payment refs, second active dispute, second quote from one seller) are resolved by
//! the constraints declared in the migrations and classified here into typed [`StoreError`] conflicts.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::{disputes, errors::is_unique_violation, new_pool, orders, quotes, transactions};
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
        QuoteRequestStatus,
        QuoteStatus,
        Transaction,
        TransactionType,
    },
    helpers::new_order_number,
    MarketplaceDatabase,
};

/// Number of attempts to find an unused order number before giving up.
const ORDER_NUMBER_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies the embedded schema migrations. Run once at startup (and in test setup).
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await.map_err(|e| StoreError::Database(e.to_string()))?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_order(&self, order: NewOrder) -> Result<InsertOrderResult, StoreError> {
        let earnings = order.amount - order.platform_fee;
        for _ in 0..ORDER_NUMBER_ATTEMPTS {
            let number = new_order_number();
            let mut tx = self.pool.begin().await?;
            let inserted = match orders::idempotent_insert(&order, &number, earnings, &mut tx).await {
                Ok(id) => id,
                Err(e) if is_unique_violation(&e, "orders.order_number") => {
                    // Collision on the generated number. Roll back and try a fresh one.
                    tx.rollback().await.ok();
                    continue;
                },
                Err(e) => return Err(e.into()),
            };
            return match inserted {
                Some(id) => {
                    transactions::insert_transaction(
                        id,
                        TransactionType::Payment,
                        order.amount,
                        &order.currency,
                        &mut tx,
                    )
                    .await?;
                    let stored = orders::fetch_order_by_id(id, &mut tx)
                        .await?
                        .ok_or_else(|| StoreError::OrderNotFound(id.to_string()))?;
                    tx.commit().await?;
                    debug!("🗃️ Order {} stored for payment ref {}", stored.order_number, order.external_payment_ref);
                    Ok(InsertOrderResult::Inserted(stored))
                },
                None => {
                    let existing = orders::fetch_order_by_payment_ref(&order.external_payment_ref, &mut tx)
                        .await?
                        .ok_or_else(|| StoreError::OrderNotFound(order.external_payment_ref.clone()))?;
                    tx.commit().await?;
                    debug!(
                        "🗃️ Duplicate delivery for payment ref {}. Existing order is {}",
                        order.external_payment_ref, existing.order_number
                    );
                    Ok(InsertOrderResult::AlreadyExists(existing))
                },
            };
        }
        Err(StoreError::OrderNumberExhausted)
    }

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_id(id, &mut conn).await?)
    }

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_number(number, &mut conn).await?)
    }

    async fn fetch_order_by_payment_ref(&self, external_ref: &str) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_payment_ref(external_ref, &mut conn).await?)
    }

    async fn update_order_status(
        &self,
        order_id: i64,
        expected: OrderStatusType,
        status: OrderStatusType,
    ) -> Result<Order, StoreError> {
        let mut conn = self.pool.acquire().await?;
        if !orders::update_order_status(order_id, expected, status, &mut conn).await? {
            let order = orders::fetch_order_by_id(order_id, &mut conn)
                .await?
                .ok_or_else(|| StoreError::OrderNotFound(order_id.to_string()))?;
            return Err(StoreError::StaleOrderStatus { order: order.order_number.as_str().to_string(), expected });
        }
        orders::fetch_order_by_id(order_id, &mut conn)
            .await?
            .ok_or_else(|| StoreError::OrderNotFound(order_id.to_string()))
    }

    async fn complete_order(&self, order_id: i64) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| StoreError::OrderNotFound(order_id.to_string()))?;
        if !orders::settle_as_completed(order_id, &mut tx).await? {
            return Err(StoreError::EscrowSettled {
                order: order.order_number.as_str().to_string(),
                status: order.escrow_status,
            });
        }
        transactions::insert_transaction(order_id, TransactionType::Payout, order.seller_earnings, &order.currency, &mut tx)
            .await?;
        if !order.platform_fee.is_zero() {
            transactions::insert_transaction(order_id, TransactionType::Fee, order.platform_fee, &order.currency, &mut tx)
                .await?;
        }
        let updated = orders::fetch_order_by_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| StoreError::OrderNotFound(order_id.to_string()))?;
        tx.commit().await?;
        debug!("🗃️ Order {} completed. Escrow released.", updated.order_number);
        Ok(updated)
    }

    async fn cancel_order(&self, order_id: i64) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| StoreError::OrderNotFound(order_id.to_string()))?;
        if !orders::settle_as_cancelled(order_id, &mut tx).await? {
            return Err(StoreError::EscrowSettled {
                order: order.order_number.as_str().to_string(),
                status: order.escrow_status,
            });
        }
        transactions::insert_transaction(order_id, TransactionType::Refund, order.amount, &order.currency, &mut tx)
            .await?;
        let updated = orders::fetch_order_by_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| StoreError::OrderNotFound(order_id.to_string()))?;
        tx.commit().await?;
        debug!("🗃️ Order {} cancelled. Escrow refunded.", updated.order_number);
        Ok(updated)
    }

    async fn fetch_transactions_for_order(&self, order_id: i64) -> Result<Vec<Transaction>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(transactions::fetch_transactions_for_order(order_id, &mut conn).await?)
    }

    async fn open_dispute(&self, dispute: NewDispute) -> Result<Dispute, StoreError> {
        let mut tx = self.pool.begin().await?;
        // Any caller-side disputability check is advisory; the order may have settled since. This read and the
        // status write below are in the same transaction as the insert, so the answer cannot go stale.
        let order = orders::fetch_order_by_id(dispute.order_id, &mut tx)
            .await?
            .ok_or_else(|| StoreError::OrderNotFound(dispute.order_id.to_string()))?;
        if !order.status.is_disputable() {
            return Err(StoreError::OrderNotDisputable {
                order: order.order_number.as_str().to_string(),
                status: order.status,
            });
        }
        let dispute_id = match disputes::insert_dispute(&dispute, &mut tx).await {
            Ok(id) => id,
            Err(e) if is_unique_violation(&e, "disputes.order_id") => return Err(StoreError::ActiveDisputeExists),
            Err(e) => return Err(e.into()),
        };
        if !orders::update_order_status(dispute.order_id, order.status, OrderStatusType::Disputed, &mut tx).await? {
            return Err(StoreError::StaleOrderStatus {
                order: order.order_number.as_str().to_string(),
                expected: order.status,
            });
        }
        let stored = disputes::fetch_dispute(dispute_id, &mut tx)
            .await?
            .ok_or(StoreError::DisputeNotFound(dispute_id))?;
        tx.commit().await?;
        debug!("🗃️ Dispute {dispute_id} opened on order id {}", dispute.order_id);
        Ok(stored)
    }

    async fn fetch_dispute(&self, dispute_id: i64) -> Result<Option<Dispute>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(disputes::fetch_dispute(dispute_id, &mut conn).await?)
    }

    async fn fetch_latest_dispute_for_order(&self, order_id: i64) -> Result<Option<Dispute>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(disputes::fetch_latest_for_order(order_id, &mut conn).await?)
    }

    async fn resolve_dispute(
        &self,
        dispute_id: i64,
        resolved_by: &ProfileId,
        resolution: DisputeResolution,
        note: Option<String>,
    ) -> Result<(Dispute, Order), StoreError> {
        let mut tx = self.pool.begin().await?;
        let dispute =
            disputes::fetch_dispute(dispute_id, &mut tx).await?.ok_or(StoreError::DisputeNotFound(dispute_id))?;
        if !dispute.status.is_active() {
            return Err(StoreError::DisputeNotActive(dispute_id));
        }
        let order = orders::fetch_order_by_id(dispute.order_id, &mut tx)
            .await?
            .ok_or_else(|| StoreError::OrderNotFound(dispute.order_id.to_string()))?;
        let order_number = order.order_number.as_str().to_string();
        let settled = match resolution {
            DisputeResolution::FullRefund | DisputeResolution::MutualCancellation => {
                let ok = orders::settle_as_cancelled(order.id, &mut tx).await?;
                if ok {
                    transactions::insert_transaction(order.id, TransactionType::Refund, order.amount, &order.currency, &mut tx)
                        .await?;
                }
                ok
            },
            DisputeResolution::ReleaseToSeller => {
                let ok = orders::settle_as_completed(order.id, &mut tx).await?;
                if ok {
                    transactions::insert_transaction(
                        order.id,
                        TransactionType::Payout,
                        order.seller_earnings,
                        &order.currency,
                        &mut tx,
                    )
                    .await?;
                    if !order.platform_fee.is_zero() {
                        transactions::insert_transaction(order.id, TransactionType::Fee, order.platform_fee, &order.currency, &mut tx)
                            .await?;
                    }
                }
                ok
            },
            DisputeResolution::PartialRefund { seller_amount } => {
                let ok = orders::settle_as_completed(order.id, &mut tx).await?;
                if ok {
                    let buyer_share = order.seller_earnings - seller_amount;
                    if !seller_amount.is_zero() {
                        transactions::insert_transaction(order.id, TransactionType::Payout, seller_amount, &order.currency, &mut tx)
                            .await?;
                    }
                    if !buyer_share.is_zero() {
                        transactions::insert_transaction(order.id, TransactionType::Refund, buyer_share, &order.currency, &mut tx)
                            .await?;
                    }
                    if !order.platform_fee.is_zero() {
                        transactions::insert_transaction(order.id, TransactionType::Fee, order.platform_fee, &order.currency, &mut tx)
                            .await?;
                    }
                }
                ok
            },
        };
        if !settled {
            return Err(StoreError::EscrowSettled { order: order_number, status: order.escrow_status });
        }
        let seller_amount = match resolution {
            DisputeResolution::PartialRefund { seller_amount } => Some(seller_amount),
            _ => None,
        };
        disputes::mark_resolved(dispute_id, resolved_by, resolution.as_label(), seller_amount, note.as_deref(), &mut tx)
            .await?;
        let resolved =
            disputes::fetch_dispute(dispute_id, &mut tx).await?.ok_or(StoreError::DisputeNotFound(dispute_id))?;
        let updated = orders::fetch_order_by_id(order.id, &mut tx)
            .await?
            .ok_or_else(|| StoreError::OrderNotFound(order.id.to_string()))?;
        tx.commit().await?;
        debug!("🗃️ Dispute {dispute_id} resolved as {} on order {}", resolution.as_label(), updated.order_number);
        Ok((resolved, updated))
    }

    async fn create_quote_request(&self, request: NewQuoteRequest) -> Result<QuoteRequest, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let id = quotes::insert_quote_request(&request, &mut conn).await?;
        quotes::fetch_quote_request(id, &mut conn).await?.ok_or(StoreError::QuoteRequestNotFound(id))
    }

    async fn fetch_quote_request(&self, request_id: i64) -> Result<Option<QuoteRequest>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(quotes::fetch_quote_request(request_id, &mut conn).await?)
    }

    async fn submit_quote(&self, quote: NewQuote) -> Result<Quote, StoreError> {
        let mut tx = self.pool.begin().await?;
        let request = quotes::fetch_quote_request(quote.quote_request_id, &mut tx)
            .await?
            .ok_or(StoreError::QuoteRequestNotFound(quote.quote_request_id))?;
        if request.status != QuoteRequestStatus::Open {
            return Err(StoreError::QuoteRequestClosed(request.id));
        }
        let quote_id = match quotes::insert_quote(&quote, &mut tx).await {
            Ok(id) => id,
            Err(e) if is_unique_violation(&e, "quotes.quote_request_id") => return Err(StoreError::DuplicateQuote),
            Err(e) => return Err(e.into()),
        };
        quotes::incr_quote_count(request.id, &mut tx).await?;
        let stored = quotes::fetch_quote(quote_id, &mut tx).await?.ok_or(StoreError::QuoteNotFound(quote_id))?;
        tx.commit().await?;
        debug!("🗃️ Quote {quote_id} from {} stored on request {}", stored.seller_id, request.id);
        Ok(stored)
    }

    async fn fetch_quote(&self, quote_id: i64) -> Result<Option<Quote>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(quotes::fetch_quote(quote_id, &mut conn).await?)
    }

    async fn fetch_quotes_for_request(&self, request_id: i64) -> Result<Vec<Quote>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(quotes::fetch_quotes_for_request(request_id, &mut conn).await?)
    }

    async fn accept_quote(&self, quote_id: i64) -> Result<(Quote, QuoteRequest), StoreError> {
        let mut tx = self.pool.begin().await?;
        let quote = quotes::fetch_quote(quote_id, &mut tx).await?.ok_or(StoreError::QuoteNotFound(quote_id))?;
        if quote.status != QuoteStatus::Pending {
            return Err(StoreError::QuoteNotPending { quote: quote_id, status: format!("{:?}", quote.status).to_lowercase() });
        }
        let request = quotes::fetch_quote_request(quote.quote_request_id, &mut tx)
            .await?
            .ok_or(StoreError::QuoteRequestNotFound(quote.quote_request_id))?;
        if request.status != QuoteRequestStatus::Open {
            return Err(StoreError::QuoteRequestClosed(request.id));
        }
        quotes::mark_accepted(quote_id, &mut tx).await?;
        quotes::reject_other_quotes(request.id, quote_id, &mut tx).await?;
        quotes::close_request(request.id, &mut tx).await?;
        let accepted = quotes::fetch_quote(quote_id, &mut tx).await?.ok_or(StoreError::QuoteNotFound(quote_id))?;
        let closed = quotes::fetch_quote_request(request.id, &mut tx)
            .await?
            .ok_or(StoreError::QuoteRequestNotFound(request.id))?;
        tx.commit().await?;
        debug!("🗃️ Quote {quote_id} accepted. Request {} closed.", request.id);
        Ok((accepted, closed))
    }
}
