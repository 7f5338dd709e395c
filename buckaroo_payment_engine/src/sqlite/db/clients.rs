use sqlx::{FromRow, SqliteConnection};

use crate::db_types::Client;
use bpg_common::{Money, Secret};

/// Raw row shape for the clients table. [`Client`] wraps the secret in [`Secret`], which has no sqlx
/// representation on purpose, so the row is fetched plain and converted.
#[derive(Debug, Clone, FromRow)]
struct ClientRow {
    id: i64,
    website_key: String,
    secret: String,
    refund_fee: i64,
    test_mode: bool,
    return_url: String,
    refunds_enabled: bool,
    frontend_url: String,
}

impl From<ClientRow> for Client {
    fn from(row: ClientRow) -> Self {
        Client {
            id: row.id,
            website_key: row.website_key,
            secret: Secret::new(row.secret),
            refund_fee: Money::from_cents(row.refund_fee),
            test_mode: row.test_mode,
            return_url: row.return_url,
            refunds_enabled: row.refunds_enabled,
            frontend_url: row.frontend_url,
        }
    }
}

pub async fn fetch_client(id: i64, conn: &mut SqliteConnection) -> Result<Option<Client>, sqlx::Error> {
    let row: Option<ClientRow> =
        sqlx::query_as("SELECT * FROM clients WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(row.map(Client::from))
}
