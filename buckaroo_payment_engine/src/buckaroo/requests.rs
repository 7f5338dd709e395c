//! Typed request payloads for the Buckaroo JSON API, and the builders that assemble them from a transaction,
//! its order and the owning client.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{
    buckaroo::BuckarooApiError,
    db_types::{Client, Order, PaymentMethod, Transaction, BANK_CODES, CARD_BRANDS},
};
use bpg_common::{Money, EUR_CURRENCY_CODE};

//--------------------------------------     ServiceAction     --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Pay,
    Refund,
}

impl Display for ServiceAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceAction::Pay => write!(f, "Pay"),
            ServiceAction::Refund => write!(f, "Refund"),
        }
    }
}

//--------------------------------------   TransactionRequest  --------------------------------------------------------
/// The body of a `POST json/Transaction/` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRequest {
    #[serde(rename = "Invoice")]
    pub invoice: String,
    #[serde(rename = "Currency")]
    pub currency: String,
    #[serde(rename = "Services")]
    pub services: Services,
    #[serde(rename = "CustomParameters")]
    pub custom_parameters: CustomParameters,
    #[serde(rename = "AmountDebit", skip_serializing_if = "Option::is_none")]
    pub amount_debit: Option<f64>,
    #[serde(rename = "ReturnURL", skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
    #[serde(rename = "AmountCredit", skip_serializing_if = "Option::is_none")]
    pub amount_credit: Option<f64>,
    #[serde(rename = "OriginalTransactionKey", skip_serializing_if = "Option::is_none")]
    pub original_transaction_key: Option<String>,
    // Merchant-side descriptor fields, echoed back by the gateway.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cardname: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Services {
    #[serde(rename = "ServiceList")]
    pub service_list: Vec<Service>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Version", skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(rename = "Action")]
    pub action: String,
    #[serde(rename = "Parameters")]
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl Parameter {
    fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomParameters {
    #[serde(rename = "List")]
    pub list: Vec<Parameter>,
}

impl TransactionRequest {
    /// The base payload shared by pay and refund calls: invoice reference, fixed currency, an empty service list
    /// and a custom parameter tagging the owning client.
    pub fn base(transaction: &Transaction, client: &Client) -> Self {
        Self {
            invoice: transaction.external_uuid.clone(),
            currency: EUR_CURRENCY_CODE.to_string(),
            services: Services::default(),
            custom_parameters: CustomParameters {
                list: vec![Parameter::new("client_id", client.id.to_string())],
            },
            amount_debit: None,
            return_url: None,
            amount_credit: None,
            original_transaction_key: None,
            payment_method: None,
            bank_code: None,
            cardname: None,
        }
    }

    /// Build a complete payment request. [`verify_transaction_fields`] must have passed before calling this.
    pub fn for_pay(transaction: &Transaction, order: &Order, client: &Client) -> Result<Self, BuckarooApiError> {
        let mut request = Self::base(transaction, client);
        request.amount_debit = Some(order.total.to_euros());
        request.return_url = Some(return_url_for_order(client, order.id));
        request.payment_method = Some(transaction.payment_method);
        request.bank_code = transaction.bank_code.clone();
        request.cardname = transaction.card.clone();
        request.add_method_service(transaction, ServiceAction::Pay)?;
        Ok(request)
    }

    /// Build a refund request for the given (already fee-adjusted) amount.
    pub fn for_refund(transaction: &Transaction, client: &Client, amount: Money) -> Result<Self, BuckarooApiError> {
        let key = transaction
            .transaction_key
            .as_deref()
            .ok_or(BuckarooApiError::RequiredFieldMissing("transaction_key"))?;
        let mut request = Self::base(transaction, client);
        request.amount_credit = Some(amount.to_euros());
        request.original_transaction_key = Some(key.to_string());
        request.add_method_service(transaction, ServiceAction::Refund)?;
        Ok(request)
    }

    /// Append the payment-method-specific service block, validating the method's required field against its
    /// whitelist.
    fn add_method_service(
        &mut self,
        transaction: &Transaction,
        action: ServiceAction,
    ) -> Result<(), BuckarooApiError> {
        let service = match transaction.payment_method {
            PaymentMethod::Ideal => {
                let bank_code = transaction
                    .bank_code
                    .as_deref()
                    .filter(|code| BANK_CODES.contains(code))
                    .ok_or(BuckarooApiError::InvalidField("bank_code"))?;
                Service {
                    name: "ideal".to_string(),
                    version: Some(2),
                    action: action.to_string(),
                    parameters: vec![Parameter::new("issuer", bank_code)],
                }
            },
            PaymentMethod::Creditcard => {
                let card = transaction
                    .card
                    .as_deref()
                    .map(str::to_lowercase)
                    .filter(|card| CARD_BRANDS.contains(&card.as_str()))
                    .ok_or(BuckarooApiError::InvalidField("card"))?;
                Service {
                    name: card,
                    version: None,
                    action: action.to_string(),
                    parameters: vec![
                        Parameter::new("RecurringInterval", ""),
                        Parameter::new("CustomerCode", ""),
                    ],
                }
            },
        };
        self.services.service_list.push(service);
        Ok(())
    }
}

/// The gateway redirects the consumer here after payment. The order id is baked into the path so that the return
/// endpoint can resolve the order without session state.
pub fn return_url_for_order(client: &Client, order_id: i64) -> String {
    format!("{}/payment_return/{order_id}/", client.return_url.trim_end_matches('/'))
}

/// Preconditions for building a payment request: the order must exist in the store and have a non-zero total.
/// Runs before any network call so that invalid transactions never reach the gateway.
pub fn verify_transaction_fields(order: &Order) -> Result<(), BuckarooApiError> {
    if order.id == 0 {
        return Err(BuckarooApiError::RequiredFieldMissing("order.id"));
    }
    if order.total.is_zero() {
        return Err(BuckarooApiError::RequiredFieldMissing("order.total"));
    }
    Ok(())
}
