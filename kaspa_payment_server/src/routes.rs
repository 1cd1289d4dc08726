//! Request handler definitions
//!
//! Define each route and its handler here. Handlers that are more than a line or two MUST go into
//! a separate module. Keep this module neat and tidy 🙏
//!
//! All handlers are async: every one of them goes to the database or the network, and a blocked
//! worker thread would stall unrelated requests.
use actix_web::{get, post, web, HttpResponse, Responder};
use kaspa_payment_engine::db_types::OrderId;
use log::*;

use crate::{
    data_objects::{ExchangeRateResult, ManualConfirmRequest, PaymentInitiateRequest, PaymentStatusResponse},
    errors::ServerError,
    GatewayApi,
    GatewayOracle,
};

/// Route handler for the health check endpoint
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

/// Route handler for `POST /api/payments/{order_id}/initiate`.
///
/// Creates (or returns) the payment record for the order and assigns its receiving address. The
/// expected amount is fixed from the current exchange rate at first initiation; repeats return
/// the original snapshot.
#[post("/payments/{order_id}/initiate")]
pub async fn initiate_payment(
    path: web::Path<String>,
    body: web::Json<PaymentInitiateRequest>,
    api: web::Data<GatewayApi>,
    oracle: web::Data<GatewayOracle>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    let params = body.into_inner();
    if params.fiat_total_cents <= 0 {
        return Err(ServerError::InvalidRequestBody("fiat_total_cents must be positive".to_string()));
    }
    let rate = oracle.get_rate().await?;
    debug!("💻️ Initiating payment for order {order_id} at {rate}");
    let initiation = api.initiate_payment(order_id, params.customer_id, params.fiat_total_cents, &rate).await?;
    let response = PaymentStatusResponse::from_record(&initiation.record);
    if initiation.newly_created {
        Ok(HttpResponse::Created().json(response))
    } else {
        Ok(HttpResponse::Ok().json(response))
    }
}

/// Route handler for `POST /api/payments/{order_id}/check`.
///
/// Runs an on-demand payment check against the chain, driven by the customer's "I have paid"
/// button. An indexer outage reports status "error" and leaves the order untouched.
#[post("/payments/{order_id}/check")]
pub async fn check_payment(
    path: web::Path<String>,
    api: web::Data<GatewayApi>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    let result = api.check_order_now(&order_id).await?;
    Ok(HttpResponse::Ok().json(PaymentStatusResponse::from_check_result(&result)))
}

/// Route handler for `POST /api/payments/{order_id}/confirm`.
///
/// Manual confirmation on an administrator's authority. Idempotent: confirming a settled order
/// returns the stored confirmation unchanged.
#[post("/payments/{order_id}/confirm")]
pub async fn confirm_payment(
    path: web::Path<String>,
    body: web::Json<ManualConfirmRequest>,
    api: web::Data<GatewayApi>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    let params = body.into_inner();
    if params.actor.trim().is_empty() {
        return Err(ServerError::InvalidRequestBody("actor must not be empty".to_string()));
    }
    info!("💻️ Manual confirmation requested for order {order_id} by {}", params.actor);
    let record = api.manually_confirm(&order_id, params.txid, &params.actor).await?;
    Ok(HttpResponse::Ok().json(PaymentStatusResponse::from_record(&record)))
}

/// Route handler for `GET /api/payments/{order_id}`.
///
/// The full payment record, including derivation index and confirmation details. Intended for
/// back-office inspection rather than storefront display.
#[get("/payments/{order_id}")]
pub async fn payment_record(
    path: web::Path<String>,
    api: web::Data<GatewayApi>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    let record = api.payment_record(&order_id).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Route handler for `GET /api/rate`.
#[get("/rate")]
pub async fn exchange_rate(oracle: web::Data<GatewayOracle>) -> Result<HttpResponse, ServerError> {
    let rate = oracle.get_rate().await?;
    Ok(HttpResponse::Ok().json(ExchangeRateResult::from(rate)))
}
