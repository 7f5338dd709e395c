use thiserror::Error;

use crate::{
    db_types::{Client, NewTransaction, Order, Transaction},
    lifecycle::{Transition, TransitionNotAllowed},
};

/// The storage contract for the payment engine.
///
/// Backends implementing this trait own all persistence for transactions, orders and merchant records. The
/// engine's flows never touch a connection directly; everything they need is expressed here.
#[allow(async_fn_in_trait)]
pub trait PaymentGatewayDatabase {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Store a new transaction record in `New` status and return the full row.
    async fn insert_transaction(&self, transaction: NewTransaction) -> Result<Transaction, PaymentGatewayError>;

    /// Fetch a transaction by its internal id.
    async fn fetch_transaction(&self, id: i64) -> Result<Option<Transaction>, PaymentGatewayError>;

    /// Fetch the transaction the gateway identifies by `payment_key`. This is the lookup the push path uses.
    async fn fetch_transaction_by_payment_key(
        &self,
        payment_key: &str,
    ) -> Result<Option<Transaction>, PaymentGatewayError>;

    /// Fetch the transaction the gateway identifies by `transaction_key`. This is the lookup the redirect path
    /// uses.
    async fn fetch_transaction_by_transaction_key(
        &self,
        transaction_key: &str,
    ) -> Result<Option<Transaction>, PaymentGatewayError>;

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, PaymentGatewayError>;

    /// Fetch the merchant record that owns the given order. A missing merchant is a configuration error, not a
    /// user error, so it maps to [`PaymentGatewayError::ClientNotFound`] rather than an `Option`.
    async fn fetch_client_for_order(&self, order: &Order) -> Result<Client, PaymentGatewayError>;

    /// Bank the keys the gateway assigned to a transaction. Either key may be absent in the gateway reply; only
    /// the keys that are present are written.
    async fn update_gateway_keys(
        &self,
        transaction_id: i64,
        payment_key: Option<&str>,
        transaction_key: Option<&str>,
    ) -> Result<(), PaymentGatewayError>;

    async fn set_redirect_url(&self, transaction_id: i64, redirect_url: &str) -> Result<(), PaymentGatewayError>;

    /// Record that a reconciliation push for this transaction was processed just now.
    async fn stamp_last_push(&self, transaction_id: i64) -> Result<(), PaymentGatewayError>;

    async fn mark_refunded(&self, transaction_id: i64) -> Result<(), PaymentGatewayError>;

    /// Apply a lifecycle transition to a transaction, atomically.
    ///
    /// The status update is a compare-and-set: the row is only updated if its current status is one of the
    /// transition's allowed source states, so two racing reconciliation paths cannot both move the same
    /// transaction. A missed compare-and-set returns [`PaymentGatewayError::TransitionNotAllowed`].
    ///
    /// When the transition carries an order side effect, the order is moved in the same database transaction.
    /// An order that is not in a valid source state for its side effect does not roll back the transaction
    /// status change; the mismatch is logged and the commit proceeds.
    ///
    /// Returns the updated transaction row.
    async fn apply_transition(
        &self,
        transaction_id: i64,
        transition: Transition,
    ) -> Result<Transaction, PaymentGatewayError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), PaymentGatewayError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum PaymentGatewayError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("The requested transaction (internal id {0}) does not exist")]
    TransactionNotFound(i64),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(i64),
    #[error("No merchant record exists for client id {0}")]
    ClientNotFound(i64),
    #[error("{0}")]
    TransitionNotAllowed(#[from] TransitionNotAllowed),
}

impl From<sqlx::Error> for PaymentGatewayError {
    fn from(e: sqlx::Error) -> Self {
        PaymentGatewayError::DatabaseError(e.to_string())
    }
}
