//----------------------------------------------   Payment events  ----------------------------------------------------

use actix_web::{web, HttpRequest, HttpResponse};
use escrow_engine::{
    db_types::{NewOrder, ProfileId},
    InsertOrderResult,
    MarketplaceDatabase,
    OrderFlowApi,
    OrderFlowError,
};
use log::{debug, error, info, trace, warn};

use crate::{
    data_objects::JsonResponse,
    payment_events::{PaymentEvent, PaymentFailedEvent},
    route,
};

route!(payment_webhook => Post "/payment" impl MarketplaceDatabase);
/// The payment processor webhook. The HMAC middleware has already verified the signature by the time this handler
/// runs, so every response from here is in the 200 range: a non-200 response would make the processor retry a
/// delivery that we have already seen and rejected for our own reasons.
pub async fn payment_webhook<B>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<OrderFlowApi<B>>,
) -> HttpResponse
where
    B: MarketplaceDatabase,
{
    trace!("🔔️ Received webhook request: {}", req.uri());
    let event = match serde_json::from_slice::<PaymentEvent>(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!("🔔️ Could not parse payment event payload. {e}");
            return HttpResponse::Ok().json(JsonResponse::failure("Could not parse event payload."));
        },
    };
    let result = match event {
        PaymentEvent::PaymentCaptured(ev) => match NewOrder::try_from(ev) {
            Err(e) => {
                warn!("🔔️ Dropping malformed payment_captured event. {e}");
                JsonResponse::failure(e)
            },
            Ok(new_order) => handle_captured(new_order, &api).await,
        },
        PaymentEvent::PaymentFailed(ev) => handle_failed(ev, &api).await,
        PaymentEvent::Other => {
            trace!("🔔️ Acknowledging payment event with no local behaviour.");
            JsonResponse::success("Event acknowledged.")
        },
    };
    HttpResponse::Ok().json(result)
}

async fn handle_captured<B: MarketplaceDatabase>(new_order: NewOrder, api: &OrderFlowApi<B>) -> JsonResponse {
    let payment_ref = new_order.external_payment_ref.clone();
    match api.process_captured_payment(new_order).await {
        Ok(InsertOrderResult::Inserted(order)) => {
            info!("🔔️ Payment {payment_ref} captured. Order {} created.", order.order_number);
            JsonResponse::success(format!("Order {} created.", order.order_number))
        },
        Ok(InsertOrderResult::AlreadyExists(order)) => {
            info!("🔔️ Payment {payment_ref} was already processed as order {}.", order.order_number);
            JsonResponse::success("Payment already processed.")
        },
        Err(OrderFlowError::ConfigurationError(e)) => {
            error!("🔔️ Fatal configuration error while processing payment {payment_ref}. {e}");
            JsonResponse::failure(e)
        },
        Err(e) => {
            warn!("🔔️ Could not process payment {payment_ref}. {e}");
            JsonResponse::failure("Unexpected error handling payment event.")
        },
    }
}

async fn handle_failed<B: MarketplaceDatabase>(ev: PaymentFailedEvent, api: &OrderFlowApi<B>) -> JsonResponse {
    debug!("🔔️ Payment failed event for ref {:?}", ev.payment_ref);
    match ev.client_id.filter(|s| !s.trim().is_empty()) {
        Some(client_id) => {
            api.notify_payment_failed(ProfileId::from(client_id), ev.reason).await;
            JsonResponse::success("Payment failure recorded.")
        },
        None => {
            warn!("🔔️ Dropping payment_failed event without a client_id.");
            JsonResponse::failure("The client_id field is missing or empty.")
        },
    }
}
