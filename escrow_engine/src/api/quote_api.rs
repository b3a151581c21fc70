use std::{fmt::Debug, sync::Arc};

use chrono::Utc;
use log::*;
use serde_json::json;

use crate::{
    api::errors::QuoteApiError,
    db_types::{Actor, NewQuote, NewQuoteRequest, Quote, QuoteRequest, QuoteStatus},
    notifications::{dispatch_all, Notification, NotificationDispatcher, NotificationType},
    MarketplaceDatabase,
};

/// `QuoteApi` runs the competitive quote negotiation that can precede an order: a client posts a request, sellers
/// submit one priced quote each, and the client accepts exactly one.
pub struct QuoteApi<B> {
    db: B,
    notifier: Arc<dyn NotificationDispatcher>,
}

impl<B> Debug for QuoteApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "QuoteApi")
    }
}

impl<B> QuoteApi<B> {
    pub fn new(db: B, notifier: Arc<dyn NotificationDispatcher>) -> Self {
        Self { db, notifier }
    }
}

impl<B> QuoteApi<B>
where B: MarketplaceDatabase
{
    pub async fn create_request(
        &self,
        actor: &Actor,
        mut request: NewQuoteRequest,
    ) -> Result<QuoteRequest, QuoteApiError> {
        if request.title.trim().is_empty() || request.description.trim().is_empty() {
            return Err(QuoteApiError::InvalidSubmission("Title and description must not be empty".to_string()));
        }
        request.client_id = actor.id.clone();
        let stored = self.db.create_quote_request(request).await?;
        info!("💬️ Quote request {} posted by {}", stored.id, stored.client_id);
        Ok(stored)
    }

    /// Fetches a request together with its quotes.
    pub async fn get_request(&self, request_id: i64) -> Result<(QuoteRequest, Vec<Quote>), QuoteApiError> {
        let request =
            self.db.fetch_quote_request(request_id).await?.ok_or(QuoteApiError::RequestNotFound(request_id))?;
        let quotes = self.db.fetch_quotes_for_request(request_id).await?;
        Ok((request, quotes))
    }

    /// Submits a priced quote on behalf of `actor`. The request must be open, and one-quote-per-bidder is enforced
    /// by the store's uniqueness guard, so two concurrent submissions from the same seller cannot both succeed. The
    /// quote insert and the request's `quote_count` increment are one transactional step. The request's client is
    /// notified.
    pub async fn submit_quote(&self, request_id: i64, actor: &Actor, mut quote: NewQuote) -> Result<Quote, QuoteApiError> {
        if quote.amount.value() <= 0 {
            return Err(QuoteApiError::InvalidSubmission("Quote amount must be positive".to_string()));
        }
        if quote.description.trim().is_empty() {
            return Err(QuoteApiError::InvalidSubmission("Description must not be empty".to_string()));
        }
        let request =
            self.db.fetch_quote_request(request_id).await?.ok_or(QuoteApiError::RequestNotFound(request_id))?;
        if request.client_id == actor.id {
            return Err(QuoteApiError::InvalidSubmission("You cannot quote on your own request".to_string()));
        }
        quote.quote_request_id = request_id;
        quote.seller_id = actor.id.clone();
        let stored = self.db.submit_quote(quote).await?;
        info!("💬️ Quote {} of {} submitted by {} on request {request_id}", stored.id, stored.amount, actor.id);
        let note = Notification::new(
            request.client_id.clone(),
            NotificationType::QuoteSubmitted,
            "New quote",
            format!("You received a quote of {} on your request \"{}\".", stored.amount, request.title),
        )
        .with_metadata(json!({ "quote_request_id": request_id, "quote_id": stored.id }));
        dispatch_all(&self.notifier, vec![note]).await;
        Ok(stored)
    }

    /// Accepts a quote on behalf of the request's client. Atomically: the quote becomes `accepted`, every other
    /// quote on the request becomes `rejected`, and the request is `closed`. An expired `valid_until` blocks
    /// acceptance, but nothing expires quotes in the background.
    pub async fn accept_quote(&self, quote_id: i64, actor: &Actor) -> Result<(Quote, QuoteRequest), QuoteApiError> {
        let quote = self.db.fetch_quote(quote_id).await?.ok_or(QuoteApiError::QuoteNotFound(quote_id))?;
        let request = self
            .db
            .fetch_quote_request(quote.quote_request_id)
            .await?
            .ok_or(QuoteApiError::RequestNotFound(quote.quote_request_id))?;
        if request.client_id != actor.id {
            return Err(QuoteApiError::Forbidden);
        }
        if quote.is_expired(Utc::now()) {
            return Err(QuoteApiError::InvalidState(format!("Quote {quote_id} has expired")));
        }
        let (accepted, closed) = self.db.accept_quote(quote_id).await?;
        info!("💬️ Quote {quote_id} accepted on request {}. Request closed.", closed.id);
        self.notify_outcome(&accepted, &closed).await;
        Ok((accepted, closed))
    }

    /// Tells every bidder how the competition ended.
    async fn notify_outcome(&self, accepted: &Quote, request: &QuoteRequest) {
        let quotes = match self.db.fetch_quotes_for_request(request.id).await {
            Ok(q) => q,
            Err(e) => {
                warn!("💬️ Could not fetch quotes for outcome notifications on request {}. {e}", request.id);
                return;
            },
        };
        let notes = quotes
            .into_iter()
            .map(|q| {
                if q.status == QuoteStatus::Accepted {
                    Notification::new(
                        q.seller_id,
                        NotificationType::QuoteAccepted,
                        "Quote accepted",
                        format!("Your quote of {} on \"{}\" was accepted.", accepted.amount, request.title),
                    )
                } else {
                    Notification::new(
                        q.seller_id,
                        NotificationType::QuoteRejected,
                        "Quote not selected",
                        format!("Your quote on \"{}\" was not selected.", request.title),
                    )
                }
                .with_metadata(json!({ "quote_request_id": request.id }))
            })
            .collect();
        dispatch_all(&self.notifier, notes).await;
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
