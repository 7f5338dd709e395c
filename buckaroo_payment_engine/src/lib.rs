//! Buckaroo Payment Engine
//!
//! The payment engine mediates payment transactions between a merchant application and the Buckaroo payment
//! gateway. This library contains the core logic; it knows nothing about HTTP servers.
//!
//! The library is divided into three main sections:
//! 1. Storage ([`mod@traits`] and [`mod@sqlite`]). The [`traits::PaymentGatewayDatabase`] trait is the storage
//!    contract; SQLite is the supported backend. You should never need to access the database directly; use the
//!    public API instead. The exception is the data types, which live in [`mod@db_types`] and are public.
//! 2. The gateway protocol ([`mod@buckaroo`] and [`mod@helpers`]): typed request/response payloads, request
//!    signing, callback signature verification, and the signed HTTP client.
//! 3. The engine public API ([`mod@bpe_api`]): the pay, refund and reconciliation flows, built on the transaction
//!    lifecycle in [`mod@lifecycle`].
//!
//! The engine also emits events when transactions change status or are refunded; subscribe through the hooks in
//! [`mod@events`].

pub mod bpe_api;
pub mod buckaroo;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod lifecycle;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use bpe_api::{PaymentFlowApi, PaymentFlowError, ReturnDisposition};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{PaymentGatewayDatabase, PaymentGatewayError};
