//! Billing-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotFound / NotFoundForCustomer | 404 |
//! | PlanNotFound | 404 |
//! | IllegalTransition | 400 |
//! | ReactivationWindowClosed | 400 |
//! | FreeTrialAlreadyUsed | 400 |
//! | CredentialMissing | 400 |
//! | ValidationFailed | 400 |
//! | PaymentFailed | 402 |
//! | Conflict | 409 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{CustomerId, DomainError, ErrorCode, SubscriptionId, Timestamp};

/// Billing-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// Subscription was not found.
    NotFound(SubscriptionId),

    /// No subscription exists for this customer.
    NotFoundForCustomer(CustomerId),

    /// Unknown plan id.
    PlanNotFound(String),

    /// Requested transition is not legal from the current status.
    IllegalTransition { current: String, attempted: String },

    /// Reactivation was requested after the next billing date passed.
    ReactivationWindowClosed { next_billing_date: Timestamp },

    /// The customer has already consumed their free trial.
    FreeTrialAlreadyUsed(CustomerId),

    /// A payment was attempted without an issued billing credential.
    CredentialMissing(CustomerId),

    /// Charge was rejected by the gateway.
    PaymentFailed { reason: String },

    /// Concurrent mutation detected on the subscription record.
    Conflict(SubscriptionId),

    /// Validation failed.
    ValidationFailed { field: String, message: String },

    /// Infrastructure error.
    Infrastructure(String),
}

impl BillingError {
    pub fn not_found(id: SubscriptionId) -> Self {
        BillingError::NotFound(id)
    }

    pub fn not_found_for_customer(customer_id: CustomerId) -> Self {
        BillingError::NotFoundForCustomer(customer_id)
    }

    pub fn plan_not_found(plan: impl Into<String>) -> Self {
        BillingError::PlanNotFound(plan.into())
    }

    pub fn illegal_transition(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        BillingError::IllegalTransition {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn reactivation_window_closed(next_billing_date: Timestamp) -> Self {
        BillingError::ReactivationWindowClosed { next_billing_date }
    }

    pub fn free_trial_already_used(customer_id: CustomerId) -> Self {
        BillingError::FreeTrialAlreadyUsed(customer_id)
    }

    pub fn credential_missing(customer_id: CustomerId) -> Self {
        BillingError::CredentialMissing(customer_id)
    }

    pub fn payment_failed(reason: impl Into<String>) -> Self {
        BillingError::PaymentFailed {
            reason: reason.into(),
        }
    }

    pub fn conflict(id: SubscriptionId) -> Self {
        BillingError::Conflict(id)
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::NotFound(_) | BillingError::NotFoundForCustomer(_) => {
                ErrorCode::SubscriptionNotFound
            }
            BillingError::PlanNotFound(_) => ErrorCode::PlanNotFound,
            BillingError::IllegalTransition { .. } => ErrorCode::InvalidStateTransition,
            BillingError::ReactivationWindowClosed { .. } => ErrorCode::ReactivationWindowClosed,
            BillingError::FreeTrialAlreadyUsed(_) => ErrorCode::FreeTrialAlreadyUsed,
            BillingError::CredentialMissing(_) => ErrorCode::BillingCredentialMissing,
            BillingError::PaymentFailed { .. } => ErrorCode::PaymentFailed,
            BillingError::Conflict(_) => ErrorCode::ConflictDetected,
            BillingError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            BillingError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-friendly error message.
    pub fn message(&self) -> String {
        match self {
            BillingError::NotFound(id) => format!("Subscription not found: {}", id),
            BillingError::NotFoundForCustomer(customer_id) => {
                format!("No subscription found for customer: {}", customer_id)
            }
            BillingError::PlanNotFound(plan) => format!("Unknown plan: {}", plan),
            BillingError::IllegalTransition { current, attempted } => {
                format!("Cannot {} subscription in {} state", attempted, current)
            }
            BillingError::ReactivationWindowClosed { next_billing_date } => format!(
                "Reactivation window closed at {}",
                next_billing_date
            ),
            BillingError::FreeTrialAlreadyUsed(customer_id) => {
                format!("Customer {} already used the free trial", customer_id)
            }
            BillingError::CredentialMissing(customer_id) => format!(
                "Billing credential not issued for customer {}",
                customer_id
            ),
            BillingError::PaymentFailed { reason } => format!("Payment failed: {}", reason),
            BillingError::Conflict(id) => {
                format!("Subscription {} was modified concurrently", id)
            }
            BillingError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            BillingError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if the next scheduler pass may retry the operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BillingError::Infrastructure(_)
                | BillingError::PaymentFailed { .. }
                | BillingError::Conflict(_)
        )
    }
}

impl std::fmt::Display for BillingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for BillingError {}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::InvalidStateTransition => BillingError::IllegalTransition {
                current: "unknown".to_string(),
                attempted: err.to_string(),
            },
            ErrorCode::PaymentFailed => BillingError::PaymentFailed {
                reason: err.to_string(),
            },
            ErrorCode::ConflictDetected => BillingError::Infrastructure(err.to_string()),
            ErrorCode::ValidationFailed => BillingError::ValidationFailed {
                field: "unknown".to_string(),
                message: err.to_string(),
            },
            _ => BillingError::Infrastructure(err.to_string()),
        }
    }
}

impl From<BillingError> for DomainError {
    fn from(err: BillingError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
