//! # Transaction lifecycle
//!
//! The transaction state machine is the correctness core of the gateway: Buckaroo may report a status more than
//! once, out of order, or long after the transaction has moved on. Every transition therefore carries an explicit
//! set of allowed source states, and the storage layer applies the transition with a conditional update
//! (`UPDATE ... WHERE status IN (sources)`) so that late or duplicate pushes can never regress a transaction that
//! has already reached a terminal state.
//!
//! Each transaction transition optionally drives a transition on the linked order. The order runs its own state
//! machine; a rejected order transition is logged by the storage layer and does not roll back the transaction
//! transition.

use std::fmt::Display;

use thiserror::Error;

use crate::db_types::{OrderState, TransactionStatus};

//--------------------------------------      Transition       --------------------------------------------------------
/// A named edge in the transaction state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The gateway accepted the payment request. `new → pending`.
    Pending,
    /// The consumer paid. `pending → success`, completes the order.
    Success,
    /// The payment failed. `new|pending → failed`, fails the order.
    Failed,
    /// The consumer or merchant cancelled. `pending → cancelled`, reopens the order.
    Cancelled,
    /// The gateway rejected the payment. `pending → rejected`, fails the order.
    Rejected,
}

impl Transition {
    /// The states this transition may be applied from. Anything else is a [`TransitionNotAllowed`].
    pub fn sources(&self) -> &'static [TransactionStatus] {
        use TransactionStatus::*;
        match self {
            Transition::Pending => &[New],
            Transition::Success => &[Pending],
            Transition::Failed => &[New, Pending],
            Transition::Cancelled => &[Pending],
            Transition::Rejected => &[Pending],
        }
    }

    pub fn target(&self) -> TransactionStatus {
        match self {
            Transition::Pending => TransactionStatus::Pending,
            Transition::Success => TransactionStatus::Success,
            Transition::Failed => TransactionStatus::Failed,
            Transition::Cancelled => TransactionStatus::Cancelled,
            Transition::Rejected => TransactionStatus::Rejected,
        }
    }

    pub fn is_allowed_from(&self, status: TransactionStatus) -> bool {
        self.sources().contains(&status)
    }

    /// The order transition that must be attempted alongside this transaction transition, if any.
    pub fn order_effect(&self) -> Option<OrderEffect> {
        match self {
            Transition::Pending => None,
            Transition::Success => Some(OrderEffect::Completed),
            Transition::Failed => Some(OrderEffect::Failure),
            Transition::Cancelled => Some(OrderEffect::CancelPay),
            Transition::Rejected => Some(OrderEffect::Failure),
        }
    }

    /// The verb published on the event channel when this transition is applied.
    pub fn verb(&self) -> &'static str {
        match self {
            Transition::Pending => "transitioned to pending",
            Transition::Success => "completed",
            Transition::Failed => "failed",
            Transition::Cancelled => "cancelled",
            Transition::Rejected => "rejected",
        }
    }

    /// The transition that drives a transaction towards the given mapped status. `New` is not a transition target.
    pub fn for_status(status: TransactionStatus) -> Option<Self> {
        match status {
            TransactionStatus::New => None,
            TransactionStatus::Pending => Some(Transition::Pending),
            TransactionStatus::Success => Some(Transition::Success),
            TransactionStatus::Failed => Some(Transition::Failed),
            TransactionStatus::Cancelled => Some(Transition::Cancelled),
            TransactionStatus::Rejected => Some(Transition::Rejected),
        }
    }
}

impl Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.target())
    }
}

//--------------------------------------      OrderEffect      --------------------------------------------------------
/// The order-side transition driven by a transaction transition.
///
/// The order's legality rules are its own; they are encoded here only so that the storage layer can apply the
/// conditional update and log a rejection without crashing the reconciliation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEffect {
    /// `pending → completed`
    Completed,
    /// `created|pending → failed`
    Failure,
    /// `pending → created`: the payment attempt was cancelled, the order is open for another attempt.
    CancelPay,
}

impl OrderEffect {
    pub fn sources(&self) -> &'static [OrderState] {
        use OrderState::*;
        match self {
            OrderEffect::Completed => &[Pending],
            OrderEffect::Failure => &[Created, Pending],
            OrderEffect::CancelPay => &[Pending],
        }
    }

    pub fn target(&self) -> OrderState {
        match self {
            OrderEffect::Completed => OrderState::Completed,
            OrderEffect::Failure => OrderState::Failed,
            OrderEffect::CancelPay => OrderState::Created,
        }
    }

    pub fn is_allowed_from(&self, state: OrderState) -> bool {
        self.sources().contains(&state)
    }
}

//--------------------------------------  TransitionNotAllowed  -------------------------------------------------------
/// Raised when a transition's current state is not in its allowed source set. Callers catch and log this; it never
/// reaches the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Transition to {transition:?} is not allowed from status {from}")]
pub struct TransitionNotAllowed {
    pub from: TransactionStatus,
    pub transition: Transition,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db_types::TransactionStatus::*;

    const ALL_STATUSES: [TransactionStatus; 6] = [New, Pending, Success, Failed, Cancelled, Rejected];
    const ALL_TRANSITIONS: [Transition; 5] =
        [Transition::Pending, Transition::Success, Transition::Failed, Transition::Cancelled, Transition::Rejected];

    #[test]
    fn transition_table() {
        assert_eq!(Transition::Pending.sources(), &[New]);
        assert_eq!(Transition::Success.sources(), &[Pending]);
        assert_eq!(Transition::Failed.sources(), &[New, Pending]);
        assert_eq!(Transition::Cancelled.sources(), &[Pending]);
        assert_eq!(Transition::Rejected.sources(), &[Pending]);
        assert_eq!(Transition::Pending.target(), Pending);
        assert_eq!(Transition::Success.target(), Success);
        assert_eq!(Transition::Failed.target(), Failed);
        assert_eq!(Transition::Cancelled.target(), Cancelled);
        assert_eq!(Transition::Rejected.target(), Rejected);
    }

    #[test]
    fn terminal_states_admit_no_transition() {
        for status in ALL_STATUSES.iter().filter(|s| s.is_terminal()) {
            for transition in ALL_TRANSITIONS {
                assert!(!transition.is_allowed_from(*status), "{transition:?} allowed from {status}");
            }
        }
    }

    #[test]
    fn order_side_effects() {
        assert_eq!(Transition::Pending.order_effect(), None);
        assert_eq!(Transition::Success.order_effect(), Some(OrderEffect::Completed));
        assert_eq!(Transition::Failed.order_effect(), Some(OrderEffect::Failure));
        assert_eq!(Transition::Cancelled.order_effect(), Some(OrderEffect::CancelPay));
        assert_eq!(Transition::Rejected.order_effect(), Some(OrderEffect::Failure));
    }

    #[test]
    fn transitions_for_mapped_statuses() {
        assert_eq!(Transition::for_status(New), None);
        for transition in ALL_TRANSITIONS {
            assert_eq!(Transition::for_status(transition.target()), Some(transition));
        }
    }
}
