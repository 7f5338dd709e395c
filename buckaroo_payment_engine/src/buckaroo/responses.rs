//! Response envelopes for the Buckaroo JSON API.
//!
//! Every field the gateway may or may not send is optional on the envelope; the accessors convert absence into
//! a [`BuckarooApiError::MissingResponseField`] naming the field, so callers can persist what *is* there
//! (best-effort bookkeeping) before failing on what is not.

use log::error;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::buckaroo::BuckarooApiError;
use bpg_common::Money;

//--------------------------------------  TransactionResponse  --------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionResponse {
    #[serde(rename = "Key")]
    pub key: Option<String>,
    #[serde(rename = "PaymentKey")]
    pub payment_key: Option<String>,
    #[serde(rename = "Status")]
    pub status: Option<StatusBlock>,
    #[serde(rename = "RequiredAction")]
    pub required_action: Option<RequiredAction>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusBlock {
    #[serde(rename = "Code")]
    pub code: Option<StatusCode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusCode {
    #[serde(rename = "Code")]
    pub code: Option<i64>,
    #[serde(rename = "Description")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequiredAction {
    #[serde(rename = "RedirectURL")]
    pub redirect_url: Option<String>,
}

impl TransactionResponse {
    /// The gateway-assigned payment key that identifies this transaction to later pushes.
    pub fn payment_key(&self) -> Result<&str, BuckarooApiError> {
        self.payment_key.as_deref().ok_or(BuckarooApiError::MissingResponseField("PaymentKey"))
    }

    /// The gateway-assigned transaction key, used for refunds and redirect lookups.
    pub fn transaction_key(&self) -> Result<&str, BuckarooApiError> {
        self.key.as_deref().ok_or(BuckarooApiError::MissingResponseField("Key"))
    }

    /// The nested business status code (`Status.Code.Code`).
    pub fn status_code(&self) -> Result<i64, BuckarooApiError> {
        self.status
            .as_ref()
            .and_then(|s| s.code.as_ref())
            .and_then(|c| c.code)
            .ok_or(BuckarooApiError::MissingResponseField("Status.Code.Code"))
    }

    /// Where the consumer must be sent to complete the payment.
    pub fn redirect_url(&self) -> Result<&str, BuckarooApiError> {
        self.required_action
            .as_ref()
            .and_then(|a| a.redirect_url.as_deref())
            .ok_or(BuckarooApiError::MissingResponseField("RequiredAction.RedirectURL"))
    }
}

//--------------------------------------      RefundInfo       --------------------------------------------------------
/// The refund options the gateway reports for a settled transaction. Every field is required; a missing key is a
/// malformed response.
#[derive(Debug, Clone, PartialEq)]
pub struct RefundInfo {
    pub is_refundable: bool,
    pub max_refund_amount: Money,
    pub partial_allowed: bool,
    pub refunded_amount: Money,
}

impl RefundInfo {
    pub fn try_from_value(response: &Value) -> Result<Self, BuckarooApiError> {
        let is_refundable = require_bool(response, "IsRefundable")?;
        let max_refund_amount = require_amount(response, "MaximumRefundAmount")?;
        let partial_allowed = require_bool(response, "AllowPartialRefund")?;
        let refunded_amount = require_amount(response, "RefundedAmount")?;
        Ok(Self { is_refundable, max_refund_amount, partial_allowed, refunded_amount })
    }
}

fn require_bool(response: &Value, key: &'static str) -> Result<bool, BuckarooApiError> {
    response[key].as_bool().ok_or_else(|| {
        error!("🧾️ '{key}' key not found in API response. Response was: {response}");
        BuckarooApiError::MissingResponseField(key)
    })
}

fn require_amount(response: &Value, key: &'static str) -> Result<Money, BuckarooApiError> {
    let value = response[key].as_f64().ok_or_else(|| {
        error!("🧾️ '{key}' key not found in API response. Response was: {response}");
        BuckarooApiError::MissingResponseField(key)
    })?;
    Money::try_from(value).map_err(|e| BuckarooApiError::JsonError(e.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_transaction_response() {
        let body = json!({
            "Key": "41C48B55FA9164E123CC73B1157459E840BE5D24",
            "PaymentKey": "A1B2C3",
            "Status": { "Code": { "Code": 790, "Description": "Pending input" } },
            "RequiredAction": { "RedirectURL": "https://testcheckout.buckaroo.nl/html/redirect/abc" },
            "SomeUnknownField": true,
        });
        let response: TransactionResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.transaction_key().unwrap(), "41C48B55FA9164E123CC73B1157459E840BE5D24");
        assert_eq!(response.payment_key().unwrap(), "A1B2C3");
        assert_eq!(response.status_code().unwrap(), 790);
        assert_eq!(response.redirect_url().unwrap(), "https://testcheckout.buckaroo.nl/html/redirect/abc");
    }

    #[test]
    fn missing_fields_are_named() {
        let response: TransactionResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(response.payment_key(), Err(BuckarooApiError::MissingResponseField("PaymentKey"))));
        assert!(matches!(response.transaction_key(), Err(BuckarooApiError::MissingResponseField("Key"))));
        assert!(matches!(response.status_code(), Err(BuckarooApiError::MissingResponseField("Status.Code.Code"))));
        let partial: TransactionResponse = serde_json::from_value(json!({"Status": {"Code": {}}})).unwrap();
        assert!(matches!(partial.status_code(), Err(BuckarooApiError::MissingResponseField("Status.Code.Code"))));
    }

    #[test]
    fn parse_refund_info() {
        let body = json!({
            "IsRefundable": true,
            "MaximumRefundAmount": 100.0,
            "AllowPartialRefund": true,
            "RefundedAmount": 0.0,
        });
        let info = RefundInfo::try_from_value(&body).unwrap();
        assert!(info.is_refundable);
        assert!(info.partial_allowed);
        assert_eq!(info.max_refund_amount, Money::from_euros(100));
        assert_eq!(info.refunded_amount, Money::from_cents(0));
    }

    #[test]
    fn refund_info_requires_every_field() {
        for missing in ["IsRefundable", "MaximumRefundAmount", "AllowPartialRefund", "RefundedAmount"] {
            let mut body = json!({
                "IsRefundable": true,
                "MaximumRefundAmount": 100.0,
                "AllowPartialRefund": true,
                "RefundedAmount": 0.0,
            });
            body.as_object_mut().unwrap().remove(missing);
            let err = RefundInfo::try_from_value(&body).unwrap_err();
            assert!(matches!(err, BuckarooApiError::MissingResponseField(name) if name == missing));
        }
    }
}
