use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use buckaroo_payment_engine::{buckaroo::BuckarooApiError, PaymentFlowError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Payload deserialization error")]
    CouldNotDeserializePayload,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The gateway call did not succeed. {0}")]
    GatewayError(String),
    #[error("The refund was not allowed. {0}")]
    RefundNotAllowed(String),
    #[error("Signature verification failed")]
    InvalidCallbackSignature,
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::CouldNotDeserializePayload => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::GatewayError(_) => StatusCode::BAD_GATEWAY,
            Self::RefundNotAllowed(_) => StatusCode::CONFLICT,
            Self::InvalidCallbackSignature => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // The gateway retries a redirect that errored, and its retry handling chokes on JSON bodies, so signature
        // failures respond with plain text.
        if matches!(self, Self::InvalidCallbackSignature) {
            return HttpResponse::build(self.status_code())
                .insert_header(ContentType::plaintext())
                .body(self.to_string());
        }
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<PaymentFlowError> for ServerError {
    fn from(e: PaymentFlowError) -> Self {
        let msg = e.to_string();
        match e {
            PaymentFlowError::Database(_) => Self::BackendError(msg),
            PaymentFlowError::Gateway(g) => match g {
                BuckarooApiError::RequiredFieldMissing(_) | BuckarooApiError::InvalidField(_) => {
                    Self::InvalidRequestBody(msg)
                },
                BuckarooApiError::RefundAmountTooHigh => Self::RefundNotAllowed(msg),
                _ => Self::GatewayError(msg),
            },
            PaymentFlowError::OrderNotFound(id) => Self::NoRecordFound(format!("Order #{id}")),
            PaymentFlowError::OrderNotPayable { .. } => Self::InvalidRequestBody(msg),
            PaymentFlowError::NotRefundable(_) | PaymentFlowError::RefundsDisabled => Self::RefundNotAllowed(msg),
            PaymentFlowError::InvalidSignature => Self::InvalidCallbackSignature,
        }
    }
}
