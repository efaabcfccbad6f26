//! # Payment Error Types
//!
//! Typed error handling for the Cash Flow Pass gateway.
//! Provider calls return `Result<T, PaymentError>`; the webhook gateway
//! reports its own outcomes through `WebhookError`.

use thiserror::Error;

/// Core error type for all payment operations
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Amount is not a finite, positive value
    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    /// Provider reported the resource as missing
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Payment provider API error
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Webhook signature verification failed
    #[error("{0}")]
    WebhookVerificationFailed(String),

    /// Webhook payload parsing error
    #[error("{0}")]
    WebhookParseError(String),

    /// An event handler could not apply its side effect
    #[error("Handler failed: {0}")]
    HandlerFailed(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PaymentError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::NetworkError(_) | PaymentError::ProviderError { .. }
        )
    }

    /// Returns the HTTP status code appropriate for this error.
    ///
    /// Provider and network failures surface as a plain 500, the caller
    /// only ever sees a generic message for those.
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::Configuration(_) => 500,
            PaymentError::InvalidRequest(_) => 400,
            PaymentError::InvalidAmount { .. } => 400,
            PaymentError::NotFound { .. } => 404,
            PaymentError::ProviderError { .. } => 500,
            PaymentError::NetworkError(_) => 500,
            PaymentError::WebhookVerificationFailed(_) => 400,
            PaymentError::WebhookParseError(_) => 400,
            PaymentError::HandlerFailed(_) => 500,
            PaymentError::Internal(_) => 500,
            PaymentError::Serialization(_) => 500,
        }
    }

    /// True for errors raised while authenticating or decoding a webhook.
    pub fn is_webhook_rejection(&self) -> bool {
        matches!(
            self,
            PaymentError::WebhookVerificationFailed(_) | PaymentError::WebhookParseError(_)
        )
    }
}

/// Result type alias for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;

/// Failures surfaced by the webhook gateway.
///
/// These are the only non-200 outcomes the webhook endpoint produces.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Webhook not configured")]
    NotConfigured,

    /// Carries the verification detail for operator debugging. Never the secret.
    #[error("Webhook Error: {0}")]
    SignatureInvalid(String),

    #[error("Dispatch of {event_type} ({event_id}) failed: {message}")]
    InternalDispatchFailure {
        event_id: String,
        event_type: String,
        message: String,
    },
}

impl WebhookError {
    pub fn status_code(&self) -> u16 {
        match self {
            WebhookError::MethodNotAllowed => 405,
            WebhookError::NotConfigured => 500,
            WebhookError::SignatureInvalid(_) => 400,
            WebhookError::InternalDispatchFailure { .. } => 500,
        }
    }

    /// Message safe to return to the caller.
    pub fn public_message(&self) -> String {
        match self {
            WebhookError::InternalDispatchFailure { .. } => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<PaymentError> for WebhookError {
    fn from(err: PaymentError) -> Self {
        WebhookError::SignatureInvalid(err.to_string())
    }
}
