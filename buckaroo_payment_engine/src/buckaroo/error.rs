use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum BuckarooApiError {
    #[error("Could not initialize gateway client: {0}")]
    Initialization(String),
    #[error("Gateway request failed: {0}")]
    RequestError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Required field missing: {0}")]
    RequiredFieldMissing(&'static str),
    #[error("Missing or erroneous field: {0}")]
    InvalidField(&'static str),
    #[error("The gateway API call was unsuccessful. HTTP status {0}")]
    GatewayCallFailed(u16),
    #[error("Unexpected gateway transaction status: {0}")]
    UnexpectedGatewayStatus(i64),
    #[error("'{0}' key not found in the gateway response")]
    MissingResponseField(&'static str),
    #[error("Refund amount exceeds the maximum the gateway allows for this transaction")]
    RefundAmountTooHigh,
}
