//! Endpoint plumbing tests.
//!
//! These run the real handlers against a real SQLite store, with the chain indexer and rate
//! sources pointed at an unreachable address. That exercises exactly the paths that must work
//! when the outside world does not: validation, 404s, manual confirmation, and the "error"
//! status for checks during an indexer outage.
use actix_web::{
    http::StatusCode,
    test::{self, TestRequest},
    web,
    App,
};
use chrono::Utc;
use kaspa_api_client::{KaspaApiConfig, RateSourceClient, RateSourceDef};
use kaspa_payment_engine::{
    checker::PaymentChecker,
    db_types::{KaspaAddress, NewPaymentRecord, OrderId, WatchOnlyKey},
    deriver::KpubAddressDeriver,
    events::EventProducers,
    oracle::RateOracle,
    traits::PaymentGatewayDatabase,
    FlowConfig,
    PaymentFlowApi,
    SqliteDatabase,
};
use kpg_common::Sompi;
use serde_json::Value;
use sqlx::migrate::MigrateDatabase;

use crate::{
    integrations::{ChainClient, PriceSource},
    routes::{check_payment, confirm_payment, exchange_rate, health, initiate_payment, payment_record},
    GatewayApi,
    GatewayOracle,
};

const UNREACHABLE: &str = "http://127.0.0.1:9";

fn test_key() -> WatchOnlyKey {
    WatchOnlyKey::try_new(format!("kpub{}", "A1b2".repeat(27))).unwrap()
}

async fn new_test_db() -> SqliteDatabase {
    let _ = env_logger::try_init();
    let url = format!("sqlite://{}/kpg_server_test_{}.db", std::env::temp_dir().display(), rand::random::<u64>());
    sqlx::Sqlite::create_database(&url).await.expect("Error creating database");
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error connecting to database");
    sqlx::migrate!("../kaspa_payment_engine/src/sqlite/migrations")
        .run(db.pool())
        .await
        .expect("Error running migrations");
    db
}

fn offline_api(db: SqliteDatabase) -> GatewayApi {
    let chain_config =
        KaspaApiConfig { base_url: UNREACHABLE.to_string(), timeout: std::time::Duration::from_millis(200) };
    let chain = ChainClient::new(chain_config).unwrap();
    let checker = PaymentChecker::new(chain, Sompi::new(1));
    PaymentFlowApi::new(db, KpubAddressDeriver::new(), checker, test_key(), EventProducers::default(), FlowConfig::default())
}

fn offline_oracle() -> GatewayOracle {
    let def = RateSourceDef {
        name: "unreachable",
        url: format!("{UNREACHABLE}/price"),
        parse: |body| body["rate"].as_f64(),
    };
    let client = RateSourceClient::new(def, std::time::Duration::from_millis(200)).unwrap();
    let source = PriceSource::new(client);
    RateOracle::new(vec![source], chrono::Duration::seconds(300), "USD".to_string())
}

async fn request(db: SqliteDatabase, req: TestRequest) -> (StatusCode, Value) {
    let app = App::new()
        .app_data(web::Data::new(offline_api(db)))
        .app_data(web::Data::new(offline_oracle()))
        .service(health)
        .service(
            web::scope("/api")
                .service(initiate_payment)
                .service(check_payment)
                .service(confirm_payment)
                .service(payment_record)
                .service(exchange_rate),
        );
    let service = test::init_service(app).await;
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body: Value = serde_json::from_slice(&test::read_body(res).await).unwrap_or(Value::Null);
    (status, body)
}

/// Seed an order straight into storage, with an address attached, so tests can exercise the
/// payment endpoints without going through the rate oracle.
async fn seed_awaiting_payment(db: &SqliteDatabase, order_id: &str) {
    let record = NewPaymentRecord {
        order_id: OrderId(order_id.to_string()),
        customer_id: "cust-1".to_string(),
        fiat_total_cents: 2_500,
        currency: "USD".to_string(),
        rate: 0.1,
        expected_amount: Sompi::from_kas(250),
        payment_started_at: Utc::now(),
    };
    db.insert_payment_record(&record).await.unwrap();
    let address = KaspaAddress::try_new("q".repeat(61)).unwrap();
    db.attach_address(&record.order_id, &address, 0).await.unwrap();
}

#[actix_web::test]
async fn health_check() {
    let db = new_test_db().await;
    let (status, _) = request(db, TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn initiation_rejects_a_non_positive_total() {
    let db = new_test_db().await;
    let body = serde_json::json!({"customer_id": "cust-1", "fiat_total_cents": 0});
    let req = TestRequest::post().uri("/api/payments/1001/initiate").set_json(&body);
    let (status, body) = request(db, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("fiat_total_cents"));
}

#[actix_web::test]
async fn initiation_without_a_rate_is_service_unavailable() {
    let db = new_test_db().await;
    let body = serde_json::json!({"customer_id": "cust-1", "fiat_total_cents": 2500});
    let req = TestRequest::post().uri("/api/payments/1001/initiate").set_json(&body);
    let (status, body) = request(db, req).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("No exchange rate"));
}

#[actix_web::test]
async fn rate_endpoint_reports_the_outage() {
    let db = new_test_db().await;
    let (status, _) = request(db, TestRequest::get().uri("/api/rate")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[actix_web::test]
async fn unknown_orders_are_not_found() {
    let db = new_test_db().await;
    let (status, _) = request(db.clone(), TestRequest::get().uri("/api/payments/ghost")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = request(db, TestRequest::post().uri("/api/payments/ghost/check")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn checking_during_an_indexer_outage_reports_error_status() {
    let db = new_test_db().await;
    seed_awaiting_payment(&db, "1001").await;
    let (status, body) = request(db, TestRequest::post().uri("/api/payments/1001/check")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert_eq!(body["order_id"], "1001");
}

#[actix_web::test]
async fn manual_confirmation_round_trip() {
    let db = new_test_db().await;
    seed_awaiting_payment(&db, "1001").await;

    let confirm = serde_json::json!({"actor": "admin-7", "txid": null});
    let req = TestRequest::post().uri("/api/payments/1001/confirm").set_json(&confirm);
    let (status, body) = request(db.clone(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    let txid = body["txid"].as_str().unwrap().to_string();
    assert!(txid.starts_with("manually-verified-"));

    // The repeat confirmation is a no-op and returns the stored txid.
    let confirm = serde_json::json!({"actor": "admin-8", "txid": "something-else"});
    let req = TestRequest::post().uri("/api/payments/1001/confirm").set_json(&confirm);
    let (status, body) = request(db.clone(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["txid"], txid.as_str());

    // The back-office record carries the confirmation details.
    let (status, body) = request(db, TestRequest::get().uri("/api/payments/1001")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ManuallyConfirmed");
    assert_eq!(body["confirmed_by"], "admin-7");
}

#[actix_web::test]
async fn manual_confirmation_requires_an_actor() {
    let db = new_test_db().await;
    seed_awaiting_payment(&db, "1001").await;
    let confirm = serde_json::json!({"actor": "  ", "txid": null});
    let req = TestRequest::post().uri("/api/payments/1001/confirm").set_json(&confirm);
    let (status, _) = request(db, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
