//! `SqliteDatabase` is a concrete implementation of a payment engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::db::{clients, db_url, new_pool, orders, transactions};
use crate::{
    db_types::{Client, NewTransaction, Order, Transaction},
    lifecycle::{Transition, TransitionNotAllowed},
    traits::{PaymentGatewayDatabase, PaymentGatewayError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new connection pool for the database at the URL given by `BPG_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, PaymentGatewayError> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, PaymentGatewayError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl PaymentGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_transaction(&self, transaction: NewTransaction) -> Result<Transaction, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let transaction = transactions::insert_transaction(transaction, &mut conn).await?;
        debug!("🗃️ Transaction #{} created for order #{}", transaction.id, transaction.order_id);
        Ok(transaction)
    }

    async fn fetch_transaction(&self, id: i64) -> Result<Option<Transaction>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        Ok(transactions::fetch_transaction(id, &mut conn).await?)
    }

    async fn fetch_transaction_by_payment_key(
        &self,
        payment_key: &str,
    ) -> Result<Option<Transaction>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        Ok(transactions::fetch_transaction_by_payment_key(payment_key, &mut conn).await?)
    }

    async fn fetch_transaction_by_transaction_key(
        &self,
        transaction_key: &str,
    ) -> Result<Option<Transaction>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        Ok(transactions::fetch_transaction_by_transaction_key(transaction_key, &mut conn).await?)
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order(order_id, &mut conn).await?)
    }

    async fn fetch_client_for_order(&self, order: &Order) -> Result<Client, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        clients::fetch_client(order.client_id, &mut conn)
            .await?
            .ok_or(PaymentGatewayError::ClientNotFound(order.client_id))
    }

    async fn update_gateway_keys(
        &self,
        transaction_id: i64,
        payment_key: Option<&str>,
        transaction_key: Option<&str>,
    ) -> Result<(), PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        transactions::update_gateway_keys(transaction_id, payment_key, transaction_key, &mut conn).await?;
        trace!("🗃️ Gateway keys banked for transaction #{transaction_id}");
        Ok(())
    }

    async fn set_redirect_url(&self, transaction_id: i64, redirect_url: &str) -> Result<(), PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        transactions::set_redirect_url(transaction_id, redirect_url, &mut conn).await
    }

    async fn stamp_last_push(&self, transaction_id: i64) -> Result<(), PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        transactions::stamp_last_push(transaction_id, &mut conn).await
    }

    async fn mark_refunded(&self, transaction_id: i64) -> Result<(), PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        transactions::mark_refunded(transaction_id, &mut conn).await?;
        info!("🗃️ Transaction #{transaction_id} marked as refunded");
        Ok(())
    }

    /// The transaction status update and the order side effect share one database transaction. The status update
    /// is the compare-and-set in [`transactions::cas_transition`]; a miss aborts with `TransitionNotAllowed`. A
    /// rejected order side effect is logged and committed over; a database error aborts everything.
    async fn apply_transition(
        &self,
        transaction_id: i64,
        transition: Transition,
    ) -> Result<Transaction, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let updated = transactions::cas_transition(transaction_id, transition, &mut tx).await?;
        let transaction = match updated {
            Some(t) => t,
            None => {
                let current = transactions::fetch_transaction(transaction_id, &mut tx)
                    .await?
                    .ok_or(PaymentGatewayError::TransactionNotFound(transaction_id))?;
                return Err(TransitionNotAllowed { from: current.status, transition }.into());
            },
        };
        if let Some(effect) = transition.order_effect() {
            let order_id = transaction.order_id;
            match orders::cas_order_state(order_id, effect, &mut tx).await? {
                Some(order) => {
                    debug!("🗃️ Order #{order_id} moved to {} alongside transaction #{transaction_id}", order.state)
                },
                None => warn!(
                    "🗃️ Order #{order_id} did not accept {effect:?} while transaction #{transaction_id} moved to \
                     {}. The transaction transition stands.",
                    transaction.status
                ),
            }
        }
        tx.commit().await?;
        Ok(transaction)
    }
}
