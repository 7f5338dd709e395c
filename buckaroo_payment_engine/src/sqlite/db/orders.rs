use chrono::Utc;
use log::debug;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{db_types::Order, lifecycle::OrderEffect};

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await
}

/// Conditionally moves an order to the effect's target state. Same compare-and-set shape as the transaction
/// update: an order outside the effect's source states matches zero rows and `None` is returned.
pub async fn cas_order_state(
    id: i64,
    effect: OrderEffect,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE orders SET state = ");
    builder.push_bind(effect.target());
    builder.push(", updated_at = ");
    builder.push_bind(Utc::now());
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" AND state IN (");
    let mut sources = builder.separated(", ");
    for source in effect.sources() {
        sources.push_bind(*source);
    }
    builder.push(") RETURNING *");
    let updated = builder.build_query_as::<Order>().fetch_optional(conn).await?;
    if let Some(order) = &updated {
        debug!("📝️ Order #{id} moved to {}", order.state);
    }
    Ok(updated)
}
