//! HTTP DTOs for the subscription endpoints.
//!
//! Every endpoint answers with the `{success, data?, message, error?}`
//! envelope; these types define that boundary between HTTP and the
//! application layer.

use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::SubscriptionStatusView;
use crate::domain::billing::{HistoryEvent, PremiumProjection, Subscription, TrialState};
use crate::ports::GatewayReceipt;

// ════════════════════════════════════════════════════════════════════════════════
// Response Envelope
// ════════════════════════════════════════════════════════════════════════════════

/// Standard response envelope for all subscription endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the operation succeeded.
    pub success: bool,
    /// The payload, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Human-readable outcome description.
    pub message: String,
    /// Error code for programmatic handling, on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Successful response with a payload.
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    /// Failure response with an error code and message.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: message.into(),
            error: Some(code.into()),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to suspend a subscription.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuspendRequest {
    /// Optional operator-supplied reason, kept in the history log.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Request to register a billing credential.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueBillingKeyRequest {
    /// One-time authorization code from the payment widget.
    pub auth_key: String,
}

/// Request to confirm billing (first charge after credential issuance).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfirmBillingRequest {
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Subscription details for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionResponse {
    pub id: String,
    pub customer_id: String,
    pub plan_id: String,
    pub plan_name: String,
    pub price: i64,
    pub status: String,
    pub billing_cycle: String,
    pub auto_renew: bool,
    pub start_date: String,
    pub next_billing_date: String,
    pub end_date: Option<String>,
    pub cancelled_at: Option<String>,
    pub grace_period_end_date: Option<String>,
    pub last_payment_date: Option<String>,
    pub retry_count: u32,
}

impl From<&Subscription> for SubscriptionResponse {
    fn from(sub: &Subscription) -> Self {
        Self {
            id: sub.id.to_string(),
            customer_id: sub.customer_id.to_string(),
            plan_id: sub.plan_id.to_string(),
            plan_name: sub.plan_name.clone(),
            price: sub.price,
            status: sub.status.as_str().to_string(),
            billing_cycle: sub.billing_cycle.as_str().to_string(),
            auto_renew: sub.auto_renew,
            start_date: sub.start_date.as_datetime().to_rfc3339(),
            next_billing_date: sub.next_billing_date.as_datetime().to_rfc3339(),
            end_date: sub.end_date.map(|t| t.as_datetime().to_rfc3339()),
            cancelled_at: sub.cancelled_at.map(|t| t.as_datetime().to_rfc3339()),
            grace_period_end_date: sub
                .grace_period_end_date
                .map(|t| t.as_datetime().to_rfc3339()),
            last_payment_date: sub.last_payment_date.map(|t| t.as_datetime().to_rfc3339()),
            retry_count: sub.retry_count,
        }
    }
}

/// Gateway receipt included in confirm-billing responses.
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptResponse {
    pub payment_key: String,
    pub total_amount: i64,
}

impl From<&GatewayReceipt> for ReceiptResponse {
    fn from(receipt: &GatewayReceipt) -> Self {
        Self {
            payment_key: receipt.payment_key.clone(),
            total_amount: receipt.total_amount,
        }
    }
}

/// Confirm-billing response: the subscription plus the charge receipt.
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmBillingResponse {
    pub subscription: SubscriptionResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<ReceiptResponse>,
}

/// Premium projection as exposed on the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PremiumResponse {
    pub is_premium: bool,
    pub subscription_status: String,
    pub last_payment_date: Option<String>,
    pub next_payment_date: Option<String>,
    pub grace_period_end_date: Option<String>,
}

impl From<&PremiumProjection> for PremiumResponse {
    fn from(projection: &PremiumProjection) -> Self {
        Self {
            is_premium: projection.is_premium,
            subscription_status: projection.subscription_status.as_str().to_string(),
            last_payment_date: projection
                .last_payment_date
                .map(|t| t.as_datetime().to_rfc3339()),
            next_payment_date: projection
                .next_payment_date
                .map(|t| t.as_datetime().to_rfc3339()),
            grace_period_end_date: projection
                .grace_period_end_date
                .map(|t| t.as_datetime().to_rfc3339()),
        }
    }
}

/// Trial window as exposed on the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct TrialResponse {
    pub used: bool,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl From<&TrialState> for TrialResponse {
    fn from(trial: &TrialState) -> Self {
        Self {
            used: trial.used,
            start_date: trial.start_date.map(|t| t.as_datetime().to_rfc3339()),
            end_date: trial.end_date.map(|t| t.as_datetime().to_rfc3339()),
        }
    }
}

/// One history entry for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntryResponse {
    pub kind: String,
    pub status: String,
    pub amount: Option<i64>,
    pub error: Option<String>,
    pub occurred_at: String,
}

impl From<&HistoryEvent> for HistoryEntryResponse {
    fn from(event: &HistoryEvent) -> Self {
        Self {
            kind: event.kind.as_str().to_string(),
            status: event.status.as_str().to_string(),
            amount: event.amount,
            error: event.error.clone(),
            occurred_at: event.occurred_at.as_datetime().to_rfc3339(),
        }
    }
}

/// Status endpoint response: subscription, projection, trial, history.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub subscription: SubscriptionResponse,
    pub premium: PremiumResponse,
    pub free_trial: TrialResponse,
    pub recent_history: Vec<HistoryEntryResponse>,
}

impl From<&SubscriptionStatusView> for StatusResponse {
    fn from(view: &SubscriptionStatusView) -> Self {
        Self {
            subscription: SubscriptionResponse::from(&view.subscription),
            premium: PremiumResponse::from(&view.projection),
            free_trial: TrialResponse::from(&view.trial),
            recent_history: view
                .recent_history
                .iter()
                .map(HistoryEntryResponse::from)
                .collect(),
        }
    }
}
