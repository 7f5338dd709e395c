use thiserror::Error;

use crate::{buckaroo::BuckarooApiError, db_types::OrderState, traits::PaymentGatewayError};

#[derive(Debug, Clone, Error)]
pub enum PaymentFlowError {
    #[error("{0}")]
    Database(#[from] PaymentGatewayError),
    #[error("{0}")]
    Gateway(#[from] BuckarooApiError),
    #[error("Order #{0} does not exist")]
    OrderNotFound(i64),
    #[error("Order #{order_id} is in state '{state}' and cannot start a payment")]
    OrderNotPayable { order_id: i64, state: OrderState },
    #[error("Transaction #{0} is not refundable")]
    NotRefundable(i64),
    #[error("Refunds are disabled")]
    RefundsDisabled,
    #[error("The callback signature is invalid")]
    InvalidSignature,
}
