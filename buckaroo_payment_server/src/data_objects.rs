use serde::{Deserialize, Serialize};

/// The body of a `POST /transaction` request from the merchant application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransactionParams {
    pub order_id: i64,
    /// The requesting owner. Must match the order's owner.
    pub owner_id: i64,
    pub payment_method: String,
    #[serde(default)]
    pub bank_code: Option<String>,
    #[serde(default)]
    pub card: Option<String>,
}

/// The JSON payload of a gateway push. Everything of interest lives under the `Transaction` key; anything the
/// gateway adds around it is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushPayload {
    #[serde(rename = "Transaction")]
    pub transaction: Option<PushTransaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushTransaction {
    #[serde(rename = "PaymentKey")]
    pub payment_key: Option<String>,
    #[serde(rename = "Status")]
    pub status: Option<PushStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushStatus {
    #[serde(rename = "Code")]
    pub code: Option<PushStatusCode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushStatusCode {
    #[serde(rename = "Code")]
    pub code: Option<i64>,
}

impl PushTransaction {
    /// The nested `Status.Code.Code` business code, if the push carried one.
    pub fn status_code(&self) -> Option<i64> {
        self.status.as_ref().and_then(|s| s.code.as_ref()).and_then(|c| c.code)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn push_payload_parsing() {
        let body = r#"{
            "Transaction": {
                "PaymentKey": "A1B2C3",
                "Status": { "Code": { "Code": 190, "Description": "Success" } },
                "AmountDebit": 25.0
            }
        }"#;
        let payload: PushPayload = serde_json::from_str(body).unwrap();
        let transaction = payload.transaction.unwrap();
        assert_eq!(transaction.payment_key.as_deref(), Some("A1B2C3"));
        assert_eq!(transaction.status_code(), Some(190));
    }

    #[test]
    fn push_payload_without_transaction() {
        let payload: PushPayload = serde_json::from_str("{}").unwrap();
        assert!(payload.transaction.is_none());
        let payload: PushPayload = serde_json::from_str(r#"{"Transaction": {}}"#).unwrap();
        let transaction = payload.transaction.unwrap();
        assert!(transaction.payment_key.is_none());
        assert_eq!(transaction.status_code(), None);
    }
}
