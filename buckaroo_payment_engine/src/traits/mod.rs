//! # Database backend contracts.
//!
//! This module defines the interface a storage backend must expose to be driven by the payment engine.
//!
//! The [`PaymentGatewayDatabase`] trait covers the full lifecycle of a payment attempt: creating transaction
//! records, banking the keys the gateway hands back, applying status transitions (with their order side effects)
//! atomically, and the bookkeeping stamps the reconciliation paths leave behind.

mod payment_gateway_database;

pub use payment_gateway_database::{PaymentGatewayDatabase, PaymentGatewayError};
