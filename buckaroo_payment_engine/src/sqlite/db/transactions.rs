use chrono::Utc;
use log::debug;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{NewTransaction, Transaction},
    lifecycle::Transition,
    traits::PaymentGatewayError,
};

pub async fn insert_transaction(
    transaction: NewTransaction,
    conn: &mut SqliteConnection,
) -> Result<Transaction, PaymentGatewayError> {
    let transaction = sqlx::query_as(
        r#"
            INSERT INTO transactions (
                order_id,
                payment_method,
                external_uuid,
                card,
                bank_code
            ) VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(transaction.order_id)
    .bind(transaction.payment_method)
    .bind(transaction.external_uuid)
    .bind(transaction.card)
    .bind(transaction.bank_code)
    .fetch_one(conn)
    .await?;
    Ok(transaction)
}

pub async fn fetch_transaction(id: i64, conn: &mut SqliteConnection) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transactions WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_transaction_by_payment_key(
    payment_key: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transactions WHERE payment_key = $1").bind(payment_key).fetch_optional(conn).await
}

pub async fn fetch_transaction_by_transaction_key(
    transaction_key: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transactions WHERE transaction_key = $1")
        .bind(transaction_key)
        .fetch_optional(conn)
        .await
}

/// Writes whichever gateway keys are present. A key the gateway did not send is left untouched, so a partial
/// reply never erases a key banked earlier.
pub async fn update_gateway_keys(
    id: i64,
    payment_key: Option<&str>,
    transaction_key: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<(), PaymentGatewayError> {
    sqlx::query(
        r#"
            UPDATE transactions SET
                payment_key = COALESCE($2, payment_key),
                transaction_key = COALESCE($3, transaction_key),
                updated_at = $4
            WHERE id = $1;
        "#,
    )
    .bind(id)
    .bind(payment_key)
    .bind(transaction_key)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn set_redirect_url(
    id: i64,
    redirect_url: &str,
    conn: &mut SqliteConnection,
) -> Result<(), PaymentGatewayError> {
    sqlx::query("UPDATE transactions SET redirect_url = $2, updated_at = $3 WHERE id = $1")
        .bind(id)
        .bind(redirect_url)
        .bind(Utc::now())
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn stamp_last_push(id: i64, conn: &mut SqliteConnection) -> Result<(), PaymentGatewayError> {
    sqlx::query("UPDATE transactions SET last_push = $2, updated_at = $2 WHERE id = $1")
        .bind(id)
        .bind(Utc::now())
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn mark_refunded(id: i64, conn: &mut SqliteConnection) -> Result<(), PaymentGatewayError> {
    sqlx::query("UPDATE transactions SET refunded = 1, updated_at = $2 WHERE id = $1")
        .bind(id)
        .bind(Utc::now())
        .execute(conn)
        .await?;
    Ok(())
}

/// Conditionally moves a transaction to the transition's target status.
///
/// The `WHERE status IN (sources)` clause makes the update a compare-and-set: a row whose status has already
/// moved on matches zero rows and `None` is returned, leaving the row untouched. Racing reconciliation paths
/// therefore resolve to exactly one winner.
pub async fn cas_transition(
    id: i64,
    transition: Transition,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE transactions SET status = ");
    builder.push_bind(transition.target());
    builder.push(", updated_at = ");
    builder.push_bind(Utc::now());
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" AND status IN (");
    let mut sources = builder.separated(", ");
    for source in transition.sources() {
        sources.push_bind(*source);
    }
    builder.push(") RETURNING *");
    let updated = builder.build_query_as::<Transaction>().fetch_optional(conn).await?;
    if let Some(transaction) = &updated {
        debug!("📝️ Transaction #{id} moved to {}", transaction.status);
    }
    Ok(updated)
}
