//! The public API of the payment engine.
//!
//! [`PaymentFlowApi`] orchestrates the payment flows (pay, refund, push and return reconciliation) over any
//! [`crate::traits::PaymentGatewayDatabase`] backend and the signed gateway client.

mod errors;
mod payment_flow;

pub use errors::PaymentFlowError;
pub use payment_flow::{PaymentFlowApi, ReturnDisposition};
