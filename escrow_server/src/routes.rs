//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, web, HttpResponse, Responder};
use escrow_engine::{
    db_types::OrderNumber,
    DisputeApi,
    MarketplaceDatabase,
    OrderFlowApi,
    QuoteApi,
};
use log::*;
use serde_json::json;

use crate::{
    auth::ActorIdentity,
    data_objects::{
        OpenDisputeRequest,
        QuoteParams,
        QuoteRequestParams,
        ResolveDisputeRequest,
        StatusUpdateRequest,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(order_by_number => Get "/orders/{order_number}" impl MarketplaceDatabase);
/// Party-gated order view: the order record together with its ledger lines.
pub async fn order_by_number<B: MarketplaceDatabase>(
    path: web::Path<String>,
    identity: ActorIdentity,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_number = OrderNumber::from(path.into_inner());
    debug!("💻️ GET order {order_number} for {}", identity.id);
    let order = api.fetch_order(&order_number, identity.actor()).await?;
    let transactions = api.fetch_ledger(&order_number, identity.actor()).await?;
    Ok(HttpResponse::Ok().json(json!({ "order": order, "transactions": transactions })))
}

route!(update_order_status => Post "/orders/{order_number}/status" impl MarketplaceDatabase);
/// Walks one edge of the order status graph on behalf of one of the order's parties.
pub async fn update_order_status<B: MarketplaceDatabase>(
    path: web::Path<String>,
    body: web::Json<StatusUpdateRequest>,
    identity: ActorIdentity,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_number = OrderNumber::from(path.into_inner());
    let target = body.into_inner().status;
    debug!("💻️ POST status {target} on order {order_number} by {}", identity.id);
    let order = api.transition(&order_number, target, identity.actor()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(cancel_order => Post "/orders/{order_number}/cancel" impl MarketplaceDatabase);
pub async fn cancel_order<B: MarketplaceDatabase>(
    path: web::Path<String>,
    identity: ActorIdentity,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_number = OrderNumber::from(path.into_inner());
    debug!("💻️ POST cancel on order {order_number} by {}", identity.id);
    let order = api.cancel(&order_number, identity.actor()).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Disputes  ----------------------------------------------------
route!(dispute_for_order => Get "/orders/{order_number}/dispute" impl MarketplaceDatabase);
/// The most recent dispute on the order, or `null` if there has never been one.
pub async fn dispute_for_order<B: MarketplaceDatabase>(
    path: web::Path<String>,
    identity: ActorIdentity,
    api: web::Data<DisputeApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_number = OrderNumber::from(path.into_inner());
    debug!("💻️ GET dispute for order {order_number} by {}", identity.id);
    let dispute = api.get(&order_number, identity.actor()).await?;
    Ok(HttpResponse::Ok().json(json!({ "dispute": dispute })))
}

route!(open_dispute => Post "/orders/{order_number}/dispute" impl MarketplaceDatabase);
pub async fn open_dispute<B: MarketplaceDatabase>(
    path: web::Path<String>,
    body: web::Json<OpenDisputeRequest>,
    identity: ActorIdentity,
    api: web::Data<DisputeApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_number = OrderNumber::from(path.into_inner());
    let params = body.into_inner();
    debug!("💻️ POST dispute on order {order_number} by {}", identity.id);
    let dispute =
        api.open(&order_number, identity.actor(), params.reason, params.description, params.evidence).await?;
    Ok(HttpResponse::Ok().json(dispute))
}

route!(resolve_dispute => Post "/disputes/{dispute_id}/resolve" impl MarketplaceDatabase);
/// Applies an arbitrator's ruling to an active dispute.
pub async fn resolve_dispute<B: MarketplaceDatabase>(
    path: web::Path<i64>,
    body: web::Json<ResolveDisputeRequest>,
    identity: ActorIdentity,
    api: web::Data<DisputeApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let dispute_id = path.into_inner();
    let params = body.into_inner();
    debug!("💻️ POST resolve dispute {dispute_id} by {}", identity.id);
    let (dispute, order) = api.resolve(dispute_id, identity.actor(), params.resolution, params.note).await?;
    Ok(HttpResponse::Ok().json(json!({ "dispute": dispute, "order": order })))
}

//----------------------------------------------   Quotes  ----------------------------------------------------
route!(create_quote_request => Post "/quote-requests" impl MarketplaceDatabase);
pub async fn create_quote_request<B: MarketplaceDatabase>(
    body: web::Json<QuoteRequestParams>,
    identity: ActorIdentity,
    api: web::Data<QuoteApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner().into_new_request(identity.actor());
    debug!("💻️ POST quote request by {}", identity.id);
    let stored = api.create_request(identity.actor(), request).await?;
    Ok(HttpResponse::Ok().json(stored))
}

route!(quote_request_by_id => Get "/quote-requests/{id}" impl MarketplaceDatabase);
pub async fn quote_request_by_id<B: MarketplaceDatabase>(
    path: web::Path<i64>,
    identity: ActorIdentity,
    api: web::Data<QuoteApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let request_id = path.into_inner();
    debug!("💻️ GET quote request {request_id} for {}", identity.id);
    let (request, quotes) = api.get_request(request_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "request": request, "quotes": quotes })))
}

route!(submit_quote => Post "/quote-requests/{id}/quotes" impl MarketplaceDatabase);
pub async fn submit_quote<B: MarketplaceDatabase>(
    path: web::Path<i64>,
    body: web::Json<QuoteParams>,
    identity: ActorIdentity,
    api: web::Data<QuoteApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let request_id = path.into_inner();
    let quote = body.into_inner().into_new_quote(request_id);
    debug!("💻️ POST quote on request {request_id} by {}", identity.id);
    let stored = api.submit_quote(request_id, identity.actor(), quote).await?;
    Ok(HttpResponse::Ok().json(stored))
}

route!(accept_quote => Post "/quotes/{quote_id}/accept" impl MarketplaceDatabase);
/// Accept-one-reject-rest: the named quote is accepted, every other quote on the request is rejected, and the
/// request is closed, all in one step.
pub async fn accept_quote<B: MarketplaceDatabase>(
    path: web::Path<i64>,
    identity: ActorIdentity,
    api: web::Data<QuoteApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let quote_id = path.into_inner();
    debug!("💻️ POST accept quote {quote_id} by {}", identity.id);
    let (quote, request) = api.accept_quote(quote_id, identity.actor()).await?;
    Ok(HttpResponse::Ok().json(json!({ "quote": quote, "request": request })))
}
