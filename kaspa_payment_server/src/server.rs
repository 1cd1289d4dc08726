use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use kaspa_payment_engine::{
    checker::PaymentChecker,
    deriver::KpubAddressDeriver,
    events::EventProducers,
    oracle::RateOracle,
    FlowConfig,
    PaymentFlowApi,
    SqliteDatabase,
};
use kpg_common::Sompi;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::{build_rate_sources, ChainClient},
    routes::{check_payment, confirm_payment, exchange_rate, health, initiate_payment, payment_record},
    sweep_worker::start_sweep_worker,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let producers = EventProducers::default();
    start_sweep_worker(db.clone(), config.clone(), producers.clone())?;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn flow_config(config: &ServerConfig) -> FlowConfig {
    FlowConfig {
        abandon_after: config.abandon_after,
        sweep_batch_size: config.sweep_batch_size,
        sweep_budget: config.sweep_budget,
    }
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let kpub = config.require_kpub()?;
    let chain = ChainClient::new(config.chain_api.clone())?;
    let sources = build_rate_sources(&config.rate_sources, config.rate_timeout)?;
    // One oracle for the whole server: the rate cache is shared across workers.
    let oracle = RateOracle::new(sources, config.rate_cache_ttl, "USD".to_string());
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let checker = PaymentChecker::new(chain.clone(), Sompi::new(config.amount_tolerance));
        let api = PaymentFlowApi::new(
            db.clone(),
            KpubAddressDeriver::new(),
            checker,
            kpub.clone(),
            producers.clone(),
            flow_config(&config),
        );
        let api_scope = web::scope("/api")
            .service(initiate_payment)
            .service(check_payment)
            .service(confirm_payment)
            .service(payment_record)
            .service(exchange_rate);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("kpg::access_log"))
            .app_data(web::Data::new(api))
            .app_data(web::Data::new(oracle.clone()))
            .service(health)
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
