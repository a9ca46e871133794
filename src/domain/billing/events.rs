//! History events emitted on every meaningful billing transition.
//!
//! Entries are immutable once written; the history log is purely
//! additive and failures while writing it never affect billing state.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{CustomerId, SubscriptionId, Timestamp};

use super::SubscriptionStatus;

/// Kind of billing history event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryEventKind {
    SubscriptionCreated,
    PaymentSuccess,
    PaymentFailed,
    SubscriptionSuspended,
    SubscriptionResumed,
    SubscriptionCancelled,
    SubscriptionReactivated,
    SubscriptionExpired,
    FreeTrialStarted,
    FreeTrialEnded,
    BillingKeyIssued,
}

impl HistoryEventKind {
    /// Stable string form used for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryEventKind::SubscriptionCreated => "subscription_created",
            HistoryEventKind::PaymentSuccess => "payment_success",
            HistoryEventKind::PaymentFailed => "payment_failed",
            HistoryEventKind::SubscriptionSuspended => "subscription_suspended",
            HistoryEventKind::SubscriptionResumed => "subscription_resumed",
            HistoryEventKind::SubscriptionCancelled => "subscription_cancelled",
            HistoryEventKind::SubscriptionReactivated => "subscription_reactivated",
            HistoryEventKind::SubscriptionExpired => "subscription_expired",
            HistoryEventKind::FreeTrialStarted => "free_trial_started",
            HistoryEventKind::FreeTrialEnded => "free_trial_ended",
            HistoryEventKind::BillingKeyIssued => "billing_key_issued",
        }
    }

    /// Parses the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "subscription_created" => Some(HistoryEventKind::SubscriptionCreated),
            "payment_success" => Some(HistoryEventKind::PaymentSuccess),
            "payment_failed" => Some(HistoryEventKind::PaymentFailed),
            "subscription_suspended" => Some(HistoryEventKind::SubscriptionSuspended),
            "subscription_resumed" => Some(HistoryEventKind::SubscriptionResumed),
            "subscription_cancelled" => Some(HistoryEventKind::SubscriptionCancelled),
            "subscription_reactivated" => Some(HistoryEventKind::SubscriptionReactivated),
            "subscription_expired" => Some(HistoryEventKind::SubscriptionExpired),
            "free_trial_started" => Some(HistoryEventKind::FreeTrialStarted),
            "free_trial_ended" => Some(HistoryEventKind::FreeTrialEnded),
            "billing_key_issued" => Some(HistoryEventKind::BillingKeyIssued),
            _ => None,
        }
    }
}

impl std::fmt::Display for HistoryEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub kind: HistoryEventKind,
    pub customer_id: CustomerId,
    pub subscription_id: SubscriptionId,

    /// Snapshot of the subscription status after the transition.
    pub status: SubscriptionStatus,

    /// Amount involved, for payment events.
    pub amount: Option<i64>,

    /// Error message, for failure events.
    pub error: Option<String>,

    /// Arbitrary extra context (order id, payment key, plan name, ...).
    pub metadata: Value,

    pub occurred_at: Timestamp,
}

impl HistoryEvent {
    /// Creates an event with empty metadata.
    pub fn new(
        kind: HistoryEventKind,
        customer_id: CustomerId,
        subscription_id: SubscriptionId,
        status: SubscriptionStatus,
        occurred_at: Timestamp,
    ) -> Self {
        Self {
            kind,
            customer_id,
            subscription_id,
            status,
            amount: None,
            error: None,
            metadata: Value::Null,
            occurred_at,
        }
    }

    /// Attaches the charged or attempted amount.
    pub fn with_amount(mut self, amount: i64) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Attaches a gateway or transition error message.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Attaches arbitrary metadata.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}
