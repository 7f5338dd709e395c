//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Actix cannot register generic handlers directly, so each handler is instantiated with the concrete database
//! type at registration time (see [`crate::server::create_server_instance`]).

use std::{collections::HashMap, str::FromStr};

use actix_web::{get, http::header, web, Either, HttpResponse, Responder};
use buckaroo_payment_engine::{
    db_types::{NewTransaction, PaymentMethod},
    traits::PaymentGatewayDatabase,
    PaymentFlowApi,
    PaymentFlowError,
};
use log::*;

use crate::{
    data_objects::{NewTransactionParams, PushPayload},
    errors::ServerError,
};

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// --------------------------------------------  Transaction  --------------------------------------------------

/// Route handler for starting a payment attempt.
///
/// The order named in the body must exist and be in `pending` state. On success the reply carries the full
/// transaction record, including the consumer redirect URL for the gateway's checkout page.
pub async fn create_transaction<B: PaymentGatewayDatabase>(
    api: web::Data<PaymentFlowApi<B>>,
    body: web::Json<NewTransactionParams>,
) -> Result<HttpResponse, ServerError> {
    let params = body.into_inner();
    debug!("💻️ New transaction request for order #{}: {}", params.order_id, params.payment_method);
    let method = PaymentMethod::from_str(&params.payment_method)
        .map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
    let mut new_transaction = NewTransaction::new(params.order_id, method);
    if let Some(bank_code) = params.bank_code {
        new_transaction = new_transaction.with_bank_code(bank_code);
    }
    if let Some(card) = params.card {
        new_transaction = new_transaction.with_card(card);
    }
    let transaction = api.pay(params.owner_id, new_transaction).await?;
    Ok(HttpResponse::Ok().json(transaction))
}

// ------------------------------------------------  Push  -----------------------------------------------------

/// Route handler for gateway pushes.
///
/// Pushes always get a 200 with a short text body. The gateway treats anything else as a delivery failure and
/// retries, so an unknown payment key or a stale status is reported in the body, never as a transport error.
pub async fn push<B: PaymentGatewayDatabase>(
    api: web::Data<PaymentFlowApi<B>>,
    body: web::Bytes,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received push notification");
    let payload = serde_json::from_slice::<PushPayload>(&body).map_err(|e| {
        debug!("💻️ Could not deserialize push payload. {e}");
        ServerError::CouldNotDeserializePayload
    })?;
    let Some(payment_key) = payload.transaction.as_ref().and_then(|t| t.payment_key.clone()) else {
        warn!("💻️ Push notification did not carry a payment key. Ignoring it.");
        return Ok(HttpResponse::Ok().body("ok"));
    };
    let code = payload.transaction.as_ref().and_then(|t| t.status_code());
    match api.process_push(&payment_key, code).await? {
        Some(_) => Ok(HttpResponse::Ok().body("ok")),
        None => Ok(HttpResponse::Ok().body("Transaction not found")),
    }
}

// ---------------------------------------------  Return  ------------------------------------------------------

/// Route handler for the consumer redirect after a checkout.
///
/// The gateway carries the `BRQ_*` fields either as a POSTed form or, depending on the merchant's gateway
/// configuration, in the query string of a GET. After verification and reconciliation the browser is forwarded
/// to the merchant's front end with the resolution in the query string. A bad signature is a hard error and
/// deliberately a plain-text 500 (see [`ServerError::error_response`]).
pub async fn payment_return<B: PaymentGatewayDatabase>(
    api: web::Data<PaymentFlowApi<B>>,
    path: web::Path<i64>,
    fields: Either<web::Form<HashMap<String, String>>, web::Query<HashMap<String, String>>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let fields = match fields {
        Either::Left(form) => form.into_inner(),
        Either::Right(query) => query.into_inner(),
    };
    debug!("💻️ Payment return for order #{order_id} with {} fields", fields.len());
    let disposition = match api.process_return(order_id, &fields).await {
        Ok(d) => d,
        Err(PaymentFlowError::InvalidSignature) => return Err(ServerError::InvalidCallbackSignature),
        Err(e) => return Err(e.into()),
    };
    Ok(HttpResponse::Found().insert_header((header::LOCATION, disposition.target)).finish())
}
