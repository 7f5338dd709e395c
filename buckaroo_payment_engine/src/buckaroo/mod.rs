//! # Buckaroo gateway protocol
//!
//! Everything that touches the Buckaroo wire format lives here: the typed request payloads and their builders,
//! the response envelope with per-field extraction, and the signed HTTP client. The orchestration of these calls
//! (state transitions, persistence) lives in [`crate::bpe_api`]; this module knows nothing about storage.

mod api;
mod error;
mod requests;
mod responses;

pub use api::{
    BuckarooApi,
    GatewayReply,
    BUCKAROO_BASE_PRODUCTION_URL,
    BUCKAROO_BASE_TEST_URL,
    BUCKAROO_CHECKOUT_PATH,
    BUCKAROO_REFUND_INFO_PATH,
};
pub use error::BuckarooApiError;
pub use requests::{return_url_for_order, verify_transaction_fields, ServiceAction, TransactionRequest};
pub use responses::{RefundInfo, TransactionResponse};
