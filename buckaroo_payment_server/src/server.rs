use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use buckaroo_payment_engine::{events::EventProducers, PaymentFlowApi, SqliteDatabase};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    middleware::GatewayHostFilterFactory,
    routes::{create_transaction, health, payment_return, push},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let flow_api = PaymentFlowApi::new(db.clone(), EventProducers::default())
            .with_refunds_disabled(config.disable_refunds);
        // The push endpoint sits behind the host filter; the return endpoint is protected by its signature
        // check instead, so it is registered outside the scope.
        let gateway_scope = web::scope("/push")
            .wrap(GatewayHostFilterFactory::new(&config.push_allowed_hosts))
            .route("", web::post().to(push::<SqliteDatabase>));
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("bps::access_log"))
            .app_data(web::Data::new(flow_api))
            .service(health)
            .route("/transaction", web::post().to(create_transaction::<SqliteDatabase>))
            .route("/payment_return/{order_id}/", web::get().to(payment_return::<SqliteDatabase>))
            .route("/payment_return/{order_id}/", web::post().to(payment_return::<SqliteDatabase>))
            .service(gateway_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
