use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use escrow_engine::{
    notifications::{LogNotifier, NotificationDispatcher},
    DisputeApi,
    OrderFlowApi,
    QuoteApi,
    SqliteDatabase,
};

use crate::{
    config::{ServerConfig, SIGNATURE_HEADER},
    errors::ServerError,
    middleware::HmacMiddlewareFactory,
    routes::{
        health,
        AcceptQuoteRoute,
        CancelOrderRoute,
        CreateQuoteRequestRoute,
        DisputeForOrderRoute,
        OpenDisputeRoute,
        OrderByNumberRoute,
        QuoteRequestByIdRoute,
        ResolveDisputeRoute,
        SubmitQuoteRoute,
        UpdateOrderStatusRoute,
    },
    webhook_routes::PaymentWebhookRoute,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    let (host, port) = (config.host.clone(), config.port);
    let srv = HttpServer::new(move || {
        let notifier: Arc<dyn NotificationDispatcher> = Arc::new(LogNotifier);
        let orders_api = OrderFlowApi::new(db.clone(), Arc::clone(&notifier));
        let disputes_api = DisputeApi::new(db.clone(), Arc::clone(&notifier));
        let quotes_api = QuoteApi::new(db.clone(), notifier);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("mes::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(disputes_api))
            .app_data(web::Data::new(quotes_api));
        // Only signature-verified payment processor deliveries reach the webhook handlers
        let webhook_scope = web::scope("/webhook")
            .wrap(HmacMiddlewareFactory::new(
                SIGNATURE_HEADER,
                config.webhook.hmac_secret.clone(),
                config.webhook.hmac_checks,
            ))
            .service(PaymentWebhookRoute::<SqliteDatabase>::new());
        // Routes that require an authenticated identity from the upstream gateway
        let api_scope = web::scope("/api")
            .service(OrderByNumberRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(DisputeForOrderRoute::<SqliteDatabase>::new())
            .service(OpenDisputeRoute::<SqliteDatabase>::new())
            .service(ResolveDisputeRoute::<SqliteDatabase>::new())
            .service(CreateQuoteRequestRoute::<SqliteDatabase>::new())
            .service(QuoteRequestByIdRoute::<SqliteDatabase>::new())
            .service(SubmitQuoteRoute::<SqliteDatabase>::new())
            .service(AcceptQuoteRoute::<SqliteDatabase>::new());
        app.service(health).service(webhook_scope).service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
