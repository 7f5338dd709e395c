use std::{
    collections::{BTreeMap, HashMap},
    fmt::Debug,
};

use log::*;

use crate::{
    bpe_api::PaymentFlowError,
    buckaroo::{BuckarooApi, GatewayReply, TransactionRequest},
    db_types::{
        Client,
        NewTransaction,
        Order,
        OrderState,
        Transaction,
        TransactionStatus,
        BUCKAROO_190_SUCCESS,
        BUCKAROO_793_ON_HOLD,
        BUCKAROO_PENDING_STATUSES,
    },
    events::{EventProducers, TransactionRefundedEvent, TransactionStatusEvent},
    helpers::{verify_callback_signature, SIGNATURE_FIELD},
    lifecycle::Transition,
    traits::{PaymentGatewayDatabase, PaymentGatewayError},
};
use bpg_common::Money;

pub const TRANSACTION_KEY_FIELD: &str = "BRQ_TRANSACTIONS";
pub const STATUS_CODE_FIELD: &str = "BRQ_STATUSCODE";

/// `PaymentFlowApi` is the primary API for driving payment attempts and reconciling gateway callbacks.
pub struct PaymentFlowApi<B> {
    db: B,
    producers: EventProducers,
    refunds_disabled: bool,
}

impl<B> Debug for PaymentFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi")
    }
}

impl<B> PaymentFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, refunds_disabled: false }
    }

    /// Globally disable refunds, regardless of per-merchant settings.
    pub fn with_refunds_disabled(mut self, disabled: bool) -> Self {
        self.refunds_disabled = disabled;
        self
    }
}

impl<B> PaymentFlowApi<B>
where B: PaymentGatewayDatabase
{
    /// Start a payment attempt for an order on behalf of `owner_id`.
    ///
    /// The order must belong to the given owner and be in `pending` state; the transaction record is created in
    /// `new` status, the signed pay request submitted, and on a happy reply (HTTP 200 with a pending business
    /// code) the transaction moves to `pending` and carries the consumer redirect URL. Keys the gateway assigned
    /// are persisted before any reply checking, so even a failed call leaves enough bookkeeping to reconcile
    /// later pushes.
    pub async fn pay(
        &self,
        owner_id: i64,
        new_transaction: NewTransaction,
    ) -> Result<Transaction, PaymentFlowError> {
        let order_id = new_transaction.order_id;
        let order =
            self.db.fetch_order(order_id).await?.ok_or(PaymentFlowError::OrderNotFound(order_id))?;
        if order.owner_id != owner_id {
            // An order you do not own looks exactly like an order that does not exist
            warn!("🔄️💳️ Owner #{owner_id} tried to start a payment for order #{order_id}, which they do not own");
            return Err(PaymentFlowError::OrderNotFound(order_id));
        }
        if order.state != OrderState::Pending {
            return Err(PaymentFlowError::OrderNotPayable { order_id, state: order.state });
        }
        crate::buckaroo::verify_transaction_fields(&order)?;
        let client = self.db.fetch_client_for_order(&order).await?;
        let transaction = self.db.insert_transaction(new_transaction).await?;
        info!("🔄️💳️ Starting payment for transaction #{} (order #{order_id})", transaction.id);
        let request = TransactionRequest::for_pay(&transaction, &order, &client)?;
        let api = BuckarooApi::for_merchant(&client)?;
        let reply = api.post_transaction(&request).await?;
        self.reconcile_pay_reply(transaction, &reply).await
    }

    /// Apply the gateway's reply to a freshly created transaction. Any keys the gateway assigned are persisted
    /// first, so that a rejected reply still leaves enough bookkeeping to reconcile later pushes.
    async fn reconcile_pay_reply(
        &self,
        transaction: Transaction,
        reply: &GatewayReply,
    ) -> Result<Transaction, PaymentFlowError> {
        self.db
            .update_gateway_keys(
                transaction.id,
                reply.transaction.payment_key().ok(),
                reply.transaction.transaction_key().ok(),
            )
            .await?;
        if !reply.is_success() {
            return Err(crate::buckaroo::BuckarooApiError::GatewayCallFailed(reply.http_status).into());
        }
        let code = reply.transaction.status_code()?;
        if !BUCKAROO_PENDING_STATUSES.contains(&code) {
            return Err(crate::buckaroo::BuckarooApiError::UnexpectedGatewayStatus(code).into());
        }
        let redirect_url = reply.transaction.redirect_url()?;
        self.db.set_redirect_url(transaction.id, redirect_url).await?;
        let transaction = self.db.apply_transition(transaction.id, Transition::Pending).await?;
        debug!("🔄️💳️ Transaction #{} is pending. Consumer redirect: {redirect_url}", transaction.id);
        self.call_status_hook(&transaction, Transition::Pending).await;
        Ok(transaction)
    }

    /// Refund (part of) a settled transaction.
    ///
    /// The refund amount is `amount - refund_fee`, with the fee waived when the subtraction would go negative.
    /// The gateway's refund-info report must allow partial refunds and cover the computed amount. A reply with
    /// business code 190 (immediate) or 793 (on hold) marks the transaction refunded.
    pub async fn refund(&self, transaction_id: i64, amount: Money) -> Result<Transaction, PaymentFlowError> {
        if self.refunds_disabled {
            warn!("🔄️↩️ Refund of transaction #{transaction_id} requested, but refunds are globally disabled");
            return Err(PaymentFlowError::RefundsDisabled);
        }
        let transaction = self
            .db
            .fetch_transaction(transaction_id)
            .await?
            .ok_or(PaymentGatewayError::TransactionNotFound(transaction_id))?;
        let order = self
            .db
            .fetch_order(transaction.order_id)
            .await?
            .ok_or(PaymentFlowError::OrderNotFound(transaction.order_id))?;
        let client = self.db.fetch_client_for_order(&order).await?;
        if !client.refunds_enabled {
            warn!("🔄️↩️ Refunds are disabled for client #{}", client.id);
            return Err(PaymentFlowError::RefundsDisabled);
        }
        if transaction.status != TransactionStatus::Success || transaction.refunded {
            return Err(PaymentFlowError::NotRefundable(transaction_id));
        }
        let key = transaction
            .transaction_key
            .as_deref()
            .ok_or(crate::buckaroo::BuckarooApiError::RequiredFieldMissing("transaction_key"))?;
        let api = BuckarooApi::for_merchant(&client)?;
        let refund_info = api.refund_info(key).await?;
        if !refund_info.is_refundable {
            warn!("🔄️↩️ The gateway reports that transaction #{transaction_id} is not refundable");
            return Err(PaymentFlowError::NotRefundable(transaction_id));
        }
        let computed = amount - client.refund_fee;
        if !refund_info.partial_allowed || computed > refund_info.max_refund_amount {
            error!(
                "🔄️↩️ Unable to refund transaction #{transaction_id}: computed amount {computed} against a \
                 maximum of {} (partial refunds allowed: {})",
                refund_info.max_refund_amount, refund_info.partial_allowed
            );
            return Err(crate::buckaroo::BuckarooApiError::RefundAmountTooHigh.into());
        }
        let refund_amount = net_refund_amount(amount, client.refund_fee);
        let request = TransactionRequest::for_refund(&transaction, &client, refund_amount)?;
        let reply = api.post_transaction(&request).await?;
        if !reply.is_success() {
            return Err(crate::buckaroo::BuckarooApiError::GatewayCallFailed(reply.http_status).into());
        }
        let code = reply.transaction.status_code()?;
        match code {
            BUCKAROO_190_SUCCESS => info!("🔄️↩️ Transaction #{transaction_id} refunded ({refund_amount})"),
            BUCKAROO_793_ON_HOLD => {
                info!("🔄️↩️ Transaction #{transaction_id} refunded ({refund_amount}), but the refund is ON HOLD")
            },
            other => {
                error!("🔄️↩️ Refund of transaction #{transaction_id} came back with business code {other}");
                return Err(crate::buckaroo::BuckarooApiError::UnexpectedGatewayStatus(other).into());
            },
        }
        self.db.mark_refunded(transaction_id).await?;
        let transaction = self
            .db
            .fetch_transaction(transaction_id)
            .await?
            .ok_or(PaymentGatewayError::TransactionNotFound(transaction_id))?;
        self.call_refund_hook(&transaction).await;
        Ok(transaction)
    }

    /// Reconcile a gateway push.
    ///
    /// An unknown payment key is a benign no-op returning `None`; the caller reports it in the response body but
    /// never as a transport error. For a known transaction the mapped transition is attempted (a guard rejection
    /// is logged, never raised) and `last_push` is stamped regardless of the outcome.
    pub async fn process_push(
        &self,
        payment_key: &str,
        code: Option<i64>,
    ) -> Result<Option<Transaction>, PaymentFlowError> {
        let Some(transaction) = self.db.fetch_transaction_by_payment_key(payment_key).await? else {
            warn!("🔄️📨️ Push for unknown payment key [{payment_key}]");
            return Ok(None);
        };
        debug!("🔄️📨️ Push for transaction #{} with status code {code:?}", transaction.id);
        let transaction = match code {
            Some(code) => self.try_transition(transaction, code).await?,
            None => transaction,
        };
        self.db.stamp_last_push(transaction.id).await?;
        Ok(Some(transaction))
    }

    /// Reconcile a consumer redirect and produce the front-end redirect target.
    ///
    /// The signature is verified against the order's owning merchant before anything else; a bad signature is
    /// fatal for the request and changes no state. A missing transaction is a no-op with a `failed` flag.
    pub async fn process_return(
        &self,
        order_id: i64,
        fields: &HashMap<String, String>,
    ) -> Result<ReturnDisposition, PaymentFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(PaymentFlowError::OrderNotFound(order_id))?;
        let client = self.db.fetch_client_for_order(&order).await?;
        if !verify_callback_signature(fields, client.secret.reveal()) {
            warn!("🔄️🔙️ Return for order #{order_id} carried an invalid signature");
            return Err(PaymentFlowError::InvalidSignature);
        }
        let transaction = match fields.get(TRANSACTION_KEY_FIELD) {
            Some(key) => self.db.fetch_transaction_by_transaction_key(key).await?,
            None => {
                error!("🔄️🔙️ Return for order #{order_id} did not carry a transaction key");
                None
            },
        };
        let code = fields.get(STATUS_CODE_FIELD).and_then(|c| c.parse::<i64>().ok());
        let (transaction, event) = match (transaction, code) {
            (Some(t), Some(code)) => {
                let before = t.status;
                let updated = self.try_transition(t, code).await?;
                let event = (updated.status != before).then(|| updated.status.to_string());
                (Some(updated), event)
            },
            (t, _) => (t, None),
        };
        let flag = match transaction.as_ref().map(|t| t.status) {
            Some(TransactionStatus::Success) => "success",
            Some(TransactionStatus::Cancelled) => "cancelled",
            _ => "failed",
        };
        debug!("🔄️🔙️ Return for order #{order_id} resolved with flag '{flag}'");
        let target = frontend_redirect_target(&client, order_id, fields, flag, event.as_deref());
        Ok(ReturnDisposition { target, transaction })
    }

    /// Map a gateway status code onto a transition and apply it. Unknown codes and guard rejections leave the
    /// transaction as it stands.
    async fn try_transition(
        &self,
        transaction: Transaction,
        code: i64,
    ) -> Result<Transaction, PaymentFlowError> {
        let Some(transition) = TransactionStatus::from_gateway_code(code).and_then(Transition::for_status) else {
            return Ok(transaction);
        };
        match self.db.apply_transition(transaction.id, transition).await {
            Ok(updated) => {
                info!("🔄️🗺️ Transaction #{} {}", updated.id, transition.verb());
                self.call_status_hook(&updated, transition).await;
                Ok(updated)
            },
            Err(PaymentGatewayError::TransitionNotAllowed(e)) => {
                // Late or duplicate callback. The record stands.
                error!("🔄️🗺️ Transaction #{} not updated: {e}", transaction.id);
                Ok(transaction)
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn call_status_hook(&self, transaction: &Transaction, transition: Transition) {
        if self.producers.status_producers.is_empty() {
            return;
        }
        let order = match self.db.fetch_order(transaction.order_id).await {
            Ok(Some(order)) => order,
            _ => {
                error!("🔄️📬️ No order #{} found while publishing a status event", transaction.order_id);
                return;
            },
        };
        debug!("🔄️📬️ Notifying subscribers that transaction #{} {}", transaction.id, transition.verb());
        for producer in &self.producers.status_producers {
            let event = TransactionStatusEvent::new(transaction.clone(), order.clone());
            producer.publish_event(event).await;
        }
    }

    async fn call_refund_hook(&self, transaction: &Transaction) {
        for producer in &self.producers.refund_producers {
            debug!("🔄️📬️ Notifying subscribers that transaction #{} was refunded", transaction.id);
            producer.publish_event(TransactionRefundedEvent::new(transaction.clone())).await;
        }
    }
}

/// The amount actually credited: the requested amount less the merchant's refund fee. No fee when the fee
/// exceeds the amount (e.g. with test transactions).
fn net_refund_amount(amount: Money, fee: Money) -> Money {
    let computed = amount - fee;
    if computed.is_negative() {
        amount
    } else {
        computed
    }
}

/// Where the consumer's browser is sent after reconciliation: the merchant front end, with the urlencoded
/// callback fields, the resolution flag and, when a transition was applied, the event name travelling as the
/// path segment after the order id. The front-end router picks the blob up as a single path parameter.
fn frontend_redirect_target(
    client: &Client,
    order_id: i64,
    fields: &HashMap<String, String>,
    flag: &str,
    event: Option<&str>,
) -> String {
    // sorted so that the target is deterministic for a given payload
    let mut echoed = fields
        .iter()
        .filter(|(k, _)| *k != SIGNATURE_FIELD)
        .collect::<BTreeMap<_, _>>()
        .into_iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>();
    echoed.push(format!("flag={}", urlencoding::encode(flag)));
    if let Some(event) = event {
        echoed.push(format!("event={}", urlencoding::encode(event)));
    }
    format!("{}/orders/paymentReturn/{order_id}/{}", client.frontend_url.trim_end_matches('/'), echoed.join("&"))
}

/// The outcome of the return path: where to send the browser, and the transaction as it stood afterwards.
#[derive(Debug, Clone)]
pub struct ReturnDisposition {
    pub target: String,
    pub transaction: Option<Transaction>,
}
