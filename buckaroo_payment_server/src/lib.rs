//! # Buckaroo payment server
//! This module hosts the HTTP surface of the payment gateway. It is responsible for:
//! * Accepting transaction-creation requests from the merchant application and starting the pay flow.
//! * Listening for push notifications and consumer redirects from Buckaroo and reconciling them.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/transaction`: Creates a transaction for an order and submits the payment to Buckaroo.
//! * `/push`: The endpoint Buckaroo pushes transaction status updates to.
//! * `/payment_return/{order_id}`: The endpoint the consumer's browser returns to after payment.

pub mod config;
pub mod data_objects;
pub mod errors;
pub mod middleware;
pub mod routes;
pub mod server;
