use std::{fmt::Display, str::FromStr};

use bpg_common::{Money, Secret};
use chrono::{DateTime, Utc};
use log::warn;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------   Gateway status codes   -----------------------------------------------------
// The numeric transaction status codes that Buckaroo reports in API responses, pushes and redirects.
pub const BUCKAROO_190_SUCCESS: i64 = 190;
pub const BUCKAROO_490_FAILED: i64 = 490;
pub const BUCKAROO_491_VALIDATION_FAILURE: i64 = 491;
pub const BUCKAROO_492_TECHNICAL_FAILURE: i64 = 492;
pub const BUCKAROO_690_REJECTED: i64 = 690;
pub const BUCKAROO_790_PENDING_INPUT: i64 = 790;
pub const BUCKAROO_791_PENDING_PROCESSING: i64 = 791;
pub const BUCKAROO_792_AWAITING_CONSUMER: i64 = 792;
pub const BUCKAROO_793_ON_HOLD: i64 = 793;
pub const BUCKAROO_890_CANCELLED_BY_USER: i64 = 890;
pub const BUCKAROO_891_CANCELLED_BY_MERCHANT: i64 = 891;

/// The business status codes that a freshly submitted payment is allowed to return.
pub const BUCKAROO_PENDING_STATUSES: [i64; 3] =
    [BUCKAROO_790_PENDING_INPUT, BUCKAROO_791_PENDING_PROCESSING, BUCKAROO_792_AWAITING_CONSUMER];

/// iDEAL issuer (BIC) codes that Buckaroo accepts.
pub const BANK_CODES: [&str; 10] = [
    "ABNANL2A", // ABN AMRO
    "ASNBNL21", // ASN Bank
    "INGBNL2A", // ING
    "RABONL2U", // Rabobank
    "SNSBNL2A", // SNS Bank
    "RBRBNL21", // RegioBank
    "TRIONL2U", // Triodos Bank
    "FVLBNL22", // Van Lanschot
    "KNABNL2H", // Knab bank
    "BUNQNL2A", // Bunq
];

/// Card brands accepted for creditcard payments.
pub const CARD_BRANDS: [&str; 2] = ["visa", "mastercard"];

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------   TransactionStatus   --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// The payment attempt has been created locally but not submitted to the gateway.
    New,
    /// The gateway has accepted the payment and is waiting for the consumer.
    Pending,
    /// The payment completed. Terminal.
    Success,
    /// The payment failed. Terminal.
    Failed,
    /// The consumer or merchant cancelled the payment. Terminal.
    Cancelled,
    /// The gateway rejected the payment. Terminal.
    Rejected,
}

impl TransactionStatus {
    /// Maps a numeric Buckaroo status code onto a local transaction status.
    ///
    /// Absent and zero codes map to `None`, as does any code that is not in the fixed mapping table. Unrecognized
    /// codes are logged so that new gateway codes show up in the logs, but they are deliberately not an error.
    pub fn from_gateway_code(code: i64) -> Option<Self> {
        match code {
            0 => None,
            BUCKAROO_190_SUCCESS => Some(Self::Success),
            BUCKAROO_890_CANCELLED_BY_USER | BUCKAROO_891_CANCELLED_BY_MERCHANT => Some(Self::Cancelled),
            BUCKAROO_790_PENDING_INPUT
            | BUCKAROO_791_PENDING_PROCESSING
            | BUCKAROO_792_AWAITING_CONSUMER
            | BUCKAROO_793_ON_HOLD => Some(Self::Pending),
            BUCKAROO_690_REJECTED => Some(Self::Rejected),
            BUCKAROO_490_FAILED | BUCKAROO_491_VALIDATION_FAILURE | BUCKAROO_492_TECHNICAL_FAILURE => {
                Some(Self::Failed)
            },
            other => {
                warn!("🗺️ Unrecognized Buckaroo status code: {other}. Ignoring it.");
                None
            },
        }
    }

    /// Terminal states are never left again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Cancelled | Self::Rejected)
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            "rejected" => Ok(Self::Rejected),
            s => Err(ConversionError(format!("Invalid transaction status: {s}"))),
        }
    }
}

//--------------------------------------     PaymentMethod     --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Ideal,
    Creditcard,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ideal => write!(f, "ideal"),
            Self::Creditcard => write!(f, "creditcard"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ideal" => Ok(Self::Ideal),
            "creditcard" => Ok(Self::Creditcard),
            s => Err(ConversionError(format!("Unknown payment method: {s}"))),
        }
    }
}

//--------------------------------------      OrderState       --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderState {
    Created,
    Pending,
    Completed,
    Failed,
    Cancelled,
    Timeout,
}

impl Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

impl FromStr for OrderState {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            "timeout" => Ok(Self::Timeout),
            s => Err(ConversionError(format!("Invalid order state: {s}"))),
        }
    }
}

//--------------------------------------      Transaction      --------------------------------------------------------
/// A single payment attempt for an [`Order`].
///
/// A transaction is created in `New` status and only ever mutated through the lifecycle transitions
/// (see [`crate::lifecycle`]) or by the reconciliation path stamping `last_push` and `redirect_url`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub order_id: i64,
    pub payment_method: PaymentMethod,
    /// Gateway-assigned key that identifies this transaction to later pushes.
    pub payment_key: Option<String>,
    /// Gateway-assigned key used for refunds and redirect lookups.
    pub transaction_key: Option<String>,
    pub refunded: bool,
    pub status: TransactionStatus,
    /// Random invoice reference sent to the gateway. Immutable after creation.
    pub external_uuid: String,
    pub redirect_url: Option<String>,
    /// Card brand. Required iff `payment_method` is `creditcard`.
    pub card: Option<String>,
    /// iDEAL issuer code. Required iff `payment_method` is `ideal`.
    pub bank_code: Option<String>,
    /// Stamped every time a reconciliation push for this transaction is processed.
    pub last_push: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     NewTransaction    --------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub order_id: i64,
    pub payment_method: PaymentMethod,
    pub card: Option<String>,
    pub bank_code: Option<String>,
    /// The invoice reference sent to the gateway. Generated at creation.
    pub external_uuid: String,
}

impl NewTransaction {
    pub fn new(order_id: i64, payment_method: PaymentMethod) -> Self {
        Self { order_id, payment_method, card: None, bank_code: None, external_uuid: new_external_uuid() }
    }

    pub fn with_bank_code<S: Into<String>>(mut self, bank_code: S) -> Self {
        self.bank_code = Some(bank_code.into());
        self
    }

    pub fn with_card<S: Into<String>>(mut self, card: S) -> Self {
        self.card = Some(card.into());
        self
    }
}

/// Generates the opaque random invoice reference for a new transaction.
pub fn new_external_uuid() -> String {
    let mut rng = rand::thread_rng();
    format!("{:032x}", rng.gen::<u128>())
}

//--------------------------------------        Order          --------------------------------------------------------
/// The business object being paid for. The order owns its own state machine; this engine only ever calls the
/// transition that matches a transaction transition and treats a rejection as a loggable local error.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub client_id: i64,
    pub owner_id: i64,
    pub state: OrderState,
    pub total: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------        Client         --------------------------------------------------------
/// A merchant tenant: holds the Buckaroo credentials and the per-merchant payment policy.
#[derive(Debug, Clone, Default)]
pub struct Client {
    pub id: i64,
    /// The Buckaroo website key. The public half of the API credentials.
    pub website_key: String,
    /// The Buckaroo secret key, used for request signing and callback verification.
    pub secret: Secret<String>,
    /// Flat fee deducted from every refund.
    pub refund_fee: Money,
    /// When true, API calls go to the Buckaroo test environment.
    pub test_mode: bool,
    /// Base URL the gateway redirects consumers back to after payment.
    pub return_url: String,
    pub refunds_enabled: bool,
    /// Base URL of the merchant front end, the target of the post-reconciliation redirect.
    pub frontend_url: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn gateway_code_mapping_is_exhaustive() {
        use TransactionStatus::*;
        let cases = [
            (190, Some(Success)),
            (890, Some(Cancelled)),
            (891, Some(Cancelled)),
            (790, Some(Pending)),
            (791, Some(Pending)),
            (792, Some(Pending)),
            (793, Some(Pending)),
            (690, Some(Rejected)),
            (490, Some(Failed)),
            (491, Some(Failed)),
            (492, Some(Failed)),
        ];
        for (code, expected) in cases {
            assert_eq!(TransactionStatus::from_gateway_code(code), expected, "code {code}");
        }
    }

    #[test]
    fn unknown_gateway_codes_map_to_none() {
        for code in [0, 1, 189, 191, 500, 794, 900, -190] {
            assert_eq!(TransactionStatus::from_gateway_code(code), None, "code {code}");
        }
    }

    #[test]
    fn terminal_statuses() {
        use TransactionStatus::*;
        assert!(!New.is_terminal());
        assert!(!Pending.is_terminal());
        for s in [Success, Failed, Cancelled, Rejected] {
            assert!(s.is_terminal());
        }
    }

    #[test]
    fn status_round_trip() {
        for s in ["new", "pending", "success", "failed", "cancelled", "rejected"] {
            let status = s.parse::<TransactionStatus>().unwrap();
            assert_eq!(status.to_string(), s);
        }
        assert!("paid".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn external_uuid_is_opaque_and_unique() {
        let a = new_external_uuid();
        let b = new_external_uuid();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
