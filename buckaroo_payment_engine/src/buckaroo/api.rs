use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde_json::Value;

use crate::{
    buckaroo::{BuckarooApiError, RefundInfo, TransactionRequest, TransactionResponse},
    db_types,
    helpers::AuthHeader,
};
use bpg_common::Secret;

pub const BUCKAROO_BASE_PRODUCTION_URL: &str = "https://checkout.buckaroo.nl/";
pub const BUCKAROO_BASE_TEST_URL: &str = "https://testcheckout.buckaroo.nl/";
pub const BUCKAROO_CHECKOUT_PATH: &str = "json/Transaction/";
pub const BUCKAROO_REFUND_INFO_PATH: &str = "json/Transaction/RefundInfo/";

/// The outcome of a gateway call that returned a parseable transaction envelope.
///
/// A non-200 reply can still carry transaction keys worth persisting, so the HTTP status travels with the
/// envelope instead of being collapsed into an error straight away.
#[derive(Debug, Clone)]
pub struct GatewayReply {
    pub http_status: u16,
    pub transaction: TransactionResponse,
}

impl GatewayReply {
    pub fn is_success(&self) -> bool {
        self.http_status == 200
    }
}

/// A signed HTTP client for the Buckaroo JSON API on behalf of one merchant.
#[derive(Debug, Clone)]
pub struct BuckarooApi {
    base_url: String,
    signer: AuthHeader,
    client: Arc<Client>,
}

impl BuckarooApi {
    pub fn new<S: Into<String>>(
        website_key: S,
        secret: Secret<String>,
        base_url: S,
    ) -> Result<Self, BuckarooApiError> {
        let website_key = website_key.into();
        if website_key.is_empty() || secret.reveal().is_empty() {
            return Err(BuckarooApiError::Initialization("The merchant credentials are not configured".to_string()));
        }
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| BuckarooApiError::Initialization(e.to_string()))?;
        let signer = AuthHeader::new(website_key, secret);
        Ok(Self { base_url: base_url.into(), signer, client: Arc::new(client) })
    }

    /// Build a client for a merchant record, selecting the test or production environment from its flag.
    pub fn for_merchant(merchant: &db_types::Client) -> Result<Self, BuckarooApiError> {
        let base_url = if merchant.test_mode { BUCKAROO_BASE_TEST_URL } else { BUCKAROO_BASE_PRODUCTION_URL };
        Self::new(merchant.website_key.clone(), merchant.secret.clone(), base_url.to_string())
    }

    /// Submit a transaction request (pay or refund) to the checkout endpoint.
    ///
    /// The body is serialized exactly once; the same bytes feed the HMAC signer and the wire. A reply that does
    /// not parse as a transaction envelope is an error; a parseable reply is returned with its HTTP status so the
    /// caller can bank any keys it carries before deciding whether the call as a whole failed.
    pub async fn post_transaction(&self, request: &TransactionRequest) -> Result<GatewayReply, BuckarooApiError> {
        let body = serde_json::to_vec(request).map_err(|e| BuckarooApiError::JsonError(e.to_string()))?;
        let url = format!("{}{BUCKAROO_CHECKOUT_PATH}", self.base_url);
        let auth = self.signer.header_for("POST", &url, Some(&body));
        trace!("🛒️ POST {url} ({} bytes)", body.len());
        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, auth)
            .body(body)
            .send()
            .await
            .map_err(|e| BuckarooApiError::RequestError(e.to_string()))?;
        let http_status = response.status().as_u16();
        let text = response.text().await.map_err(|e| BuckarooApiError::RequestError(e.to_string()))?;
        let transaction = serde_json::from_str::<TransactionResponse>(&text).map_err(|e| {
            error!("🛒️ Gateway reply ({http_status}) was not a transaction envelope: {text}");
            if http_status == 200 {
                BuckarooApiError::JsonError(e.to_string())
            } else {
                BuckarooApiError::GatewayCallFailed(http_status)
            }
        })?;
        debug!("🛒️ Gateway replied {http_status} with status code {:?}", transaction.status_code().ok());
        Ok(GatewayReply { http_status, transaction })
    }

    /// Fetch the refund options for a settled transaction.
    pub async fn refund_info(&self, transaction_key: &str) -> Result<RefundInfo, BuckarooApiError> {
        let url = format!("{}{BUCKAROO_REFUND_INFO_PATH}{transaction_key}", self.base_url);
        let auth = self.signer.header_for("GET", &url, None);
        trace!("🛒️ GET {url}");
        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, auth)
            .send()
            .await
            .map_err(|e| BuckarooApiError::RequestError(e.to_string()))?;
        let http_status = response.status().as_u16();
        let text = response.text().await.map_err(|e| BuckarooApiError::RequestError(e.to_string()))?;
        if http_status != 200 {
            error!("🛒️ RefundInfo call for {transaction_key} failed ({http_status}): {text}");
            return Err(BuckarooApiError::GatewayCallFailed(http_status));
        }
        let value = serde_json::from_str::<Value>(&text).map_err(|e| BuckarooApiError::JsonError(e.to_string()))?;
        RefundInfo::try_from_value(&value)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn merchant(test_mode: bool) -> db_types::Client {
        db_types::Client {
            website_key: "myWebsiteKey".to_string(),
            secret: Secret::new("mySecretKey".to_string()),
            test_mode,
            ..db_types::Client::default()
        }
    }

    #[test]
    fn merchant_flag_selects_environment() {
        let api = BuckarooApi::for_merchant(&merchant(true)).unwrap();
        assert_eq!(api.base_url(), BUCKAROO_BASE_TEST_URL);
        let api = BuckarooApi::for_merchant(&merchant(false)).unwrap();
        assert_eq!(api.base_url(), BUCKAROO_BASE_PRODUCTION_URL);
    }

    #[test]
    fn missing_credentials_fail_at_construction() {
        let mut unconfigured = merchant(true);
        unconfigured.website_key = String::new();
        let err = BuckarooApi::for_merchant(&unconfigured).unwrap_err();
        assert!(matches!(err, BuckarooApiError::Initialization(_)));
        let mut unconfigured = merchant(true);
        unconfigured.secret = Secret::default();
        assert!(BuckarooApi::for_merchant(&unconfigured).is_err());
    }

    #[test]
    fn reply_success() {
        let reply = GatewayReply { http_status: 200, transaction: TransactionResponse::default() };
        assert!(reply.is_success());
        let reply = GatewayReply { http_status: 400, transaction: TransactionResponse::default() };
        assert!(!reply.is_success());
    }
}
