//! Payment gateway port.
//!
//! Two operations are consumed by the core: issuing a reusable billing
//! credential for a customer, and charging that credential on demand.
//!
//! # Design
//!
//! - **Unique order ids**: the gateway rejects duplicate order ids,
//!   which is the de-facto idempotency guard against double charges.
//! - **Error classification**: every gateway error is either retryable
//!   (timeout, insufficient balance, rate limit) or terminal (invalid
//!   credential, unauthorized key). Terminal errors short-circuit the
//!   retry budget.

use crate::domain::foundation::{CustomerId, DomainError, ErrorCode, OrderId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for the external payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Issue a reusable billing credential for the customer.
    ///
    /// Idempotent per `authorization_code`: re-presenting the same code
    /// returns the same credential.
    async fn issue_billing_credential(
        &self,
        customer_id: &CustomerId,
        authorization_code: &str,
    ) -> Result<BillingCredential, GatewayError>;

    /// Charge the stored billing credential.
    ///
    /// `request.order_id` must be unique per attempt; the gateway
    /// rejects duplicates with [`GatewayErrorCode::DuplicateOrder`].
    async fn charge(&self, request: ChargeRequest) -> Result<GatewayReceipt, GatewayError>;
}

/// Reusable billing credential issued by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingCredential {
    /// Opaque token authorizing future charges.
    pub credential: String,
}

/// A single charge attempt against a stored credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    pub credential: String,
    pub amount: i64,
    pub order_id: OrderId,
    pub order_name: String,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
}

/// Successful charge as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayReceipt {
    /// Gateway transaction key.
    pub payment_key: String,

    /// Amount actually charged.
    pub total_amount: i64,
}

/// Structured error from a gateway operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayError {
    pub code: GatewayErrorCode,
    pub message: String,

    /// Provider's own error code, when one was returned.
    pub provider_code: Option<String>,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Timeout, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NetworkError, message)
    }

    pub fn invalid_credential(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidCredential, message)
    }

    pub fn insufficient_balance(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InsufficientBalance, message)
    }

    /// A terminal error cannot succeed on a later retry; the next
    /// scheduler pass should not re-attempt it.
    pub fn is_terminal(&self) -> bool {
        self.code.is_terminal()
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for DomainError {
    fn from(err: GatewayError) -> Self {
        DomainError::new(ErrorCode::GatewayError, err.message)
            .with_detail("gateway_code", err.code.to_string())
    }
}

/// Gateway error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    /// The call did not complete within the timeout. Retryable.
    Timeout,

    /// Network connectivity issue. Retryable.
    NetworkError,

    /// The account had insufficient balance. Retryable.
    InsufficientBalance,

    /// Rate or spending limit exceeded. Retryable.
    RateLimitExceeded,

    /// The stored billing credential is invalid. Terminal.
    InvalidCredential,

    /// The API key was rejected. Terminal.
    UnauthorizedKey,

    /// The billing method is not supported. Terminal.
    UnsupportedMethod,

    /// The order id was already used. Terminal for this attempt.
    DuplicateOrder,

    /// Provider-side error with no finer classification.
    ProviderError,
}

impl GatewayErrorCode {
    /// Terminal errors cannot succeed on a later retry.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GatewayErrorCode::InvalidCredential
                | GatewayErrorCode::UnauthorizedKey
                | GatewayErrorCode::UnsupportedMethod
                | GatewayErrorCode::DuplicateOrder
        )
    }

    pub fn is_retryable(&self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::Timeout => "timeout",
            GatewayErrorCode::NetworkError => "network_error",
            GatewayErrorCode::InsufficientBalance => "insufficient_balance",
            GatewayErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            GatewayErrorCode::InvalidCredential => "invalid_credential",
            GatewayErrorCode::UnauthorizedKey => "unauthorized_key",
            GatewayErrorCode::UnsupportedMethod => "unsupported_method",
            GatewayErrorCode::DuplicateOrder => "duplicate_order",
            GatewayErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_gateway_is_object_safe() {
        fn _accepts_dyn(_gateway: &dyn PaymentGateway) {}
    }

    #[test]
    fn retryable_codes_are_not_terminal() {
        assert!(!GatewayErrorCode::Timeout.is_terminal());
        assert!(!GatewayErrorCode::InsufficientBalance.is_terminal());
        assert!(!GatewayErrorCode::RateLimitExceeded.is_terminal());
        assert!(!GatewayErrorCode::NetworkError.is_terminal());
    }

    #[test]
    fn credential_and_key_errors_are_terminal() {
        assert!(GatewayErrorCode::InvalidCredential.is_terminal());
        assert!(GatewayErrorCode::UnauthorizedKey.is_terminal());
        assert!(GatewayErrorCode::UnsupportedMethod.is_terminal());
        assert!(GatewayErrorCode::DuplicateOrder.is_terminal());
    }

    #[test]
    fn gateway_error_display_includes_code_and_message() {
        let err = GatewayError::timeout("gateway did not answer in 30s");
        assert!(err.to_string().contains("timeout"));
        assert!(err.to_string().contains("30s"));
    }

    #[test]
    fn gateway_error_converts_to_domain_error() {
        let err = GatewayError::invalid_credential("billing key revoked");
        let domain: DomainError = err.into();
        assert_eq!(
            domain.details.get("gateway_code").map(String::as_str),
            Some("invalid_credential")
        );
    }
}
