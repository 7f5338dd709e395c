use serde::{Deserialize, Serialize};

use crate::db_types::{Order, Transaction, TransactionStatus};

/// Published whenever a lifecycle transition is applied to a transaction. `order` is the order as it stood after
/// the transition's side effect, if any, was attempted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionStatusEvent {
    pub transaction: Transaction,
    pub order: Order,
    pub new_status: TransactionStatus,
}

impl TransactionStatusEvent {
    pub fn new(transaction: Transaction, order: Order) -> Self {
        let new_status = transaction.status;
        Self { transaction, order, new_status }
    }
}

/// Published when a refund has been accepted by the gateway and the transaction marked as refunded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRefundedEvent {
    pub transaction: Transaction,
}

impl TransactionRefundedEvent {
    pub fn new(transaction: Transaction) -> Self {
        Self { transaction }
    }
}
